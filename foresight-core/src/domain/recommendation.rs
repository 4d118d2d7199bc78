//! Recommendation: the single discrete action produced per analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::signal::Signal;

/// Discrete trading action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

impl Action {
    /// Map a composite score to its label.
    ///
    /// Each band is open on the left and closed on the right, except the top
    /// band which is strictly `> 0.6`.
    pub fn from_composite(composite: f64) -> Self {
        if composite > 0.6 {
            Action::StrongBuy
        } else if composite > 0.3 {
            Action::Buy
        } else if composite > -0.3 {
            Action::Hold
        } else if composite > -0.6 {
            Action::Sell
        } else {
            Action::StrongSell
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::StrongSell => "Strong Sell",
            Action::Sell => "Sell",
            Action::Hold => "Hold",
            Action::Buy => "Buy",
            Action::StrongBuy => "Strong Buy",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Component signals that fed a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub forecast: Signal,
    pub fundamental: Signal,
    pub sentiment: Signal,
}

/// Final output of one analysis. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    composite: f64,
    action: Action,
    confidence: f64,
    breakdown: ScoreBreakdown,
}

impl Recommendation {
    /// `composite` is clamped into [-1, 1]; NaN is treated as 0.
    pub fn new(composite: f64, breakdown: ScoreBreakdown) -> Self {
        let composite = if composite.is_nan() {
            0.0
        } else {
            composite.clamp(-1.0, 1.0)
        };
        Self {
            composite,
            action: Action::from_composite(composite),
            confidence: composite.abs(),
            breakdown,
        }
    }

    pub fn composite(&self) -> f64 {
        self.composite
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }
}

//! Historical volatility: sample standard deviation of daily log-returns over
//! a trailing window.
//!
//! The estimator fails closed. With fewer than three valid closes (two
//! log-returns, the least a sample std can be taken over) it returns a
//! zero estimate flagged as [`VolatilityBasis::InsufficientData`], so callers
//! can tell "no history" apart from "prices genuinely did not move".

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::PriceSeries;
use crate::stats::sample_std;

/// Why the estimate has the value it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityBasis {
    /// Computed from at least two log-returns.
    Measured,
    /// Fewer than three valid closes; sigma forced to 0.
    InsufficientData,
}

/// Daily log-return dispersion. `sigma >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityEstimate {
    pub sigma: f64,
    /// Number of log-returns the estimate was computed from.
    pub observations: usize,
    pub basis: VolatilityBasis,
}

impl VolatilityEstimate {
    /// A measured estimate with an explicit sigma, e.g. for tests or overrides.
    pub fn measured(sigma: f64, observations: usize) -> Self {
        Self {
            sigma: sigma.max(0.0),
            observations,
            basis: VolatilityBasis::Measured,
        }
    }

    pub fn insufficient() -> Self {
        Self {
            sigma: 0.0,
            observations: 0,
            basis: VolatilityBasis::InsufficientData,
        }
    }

    pub fn is_insufficient_data(&self) -> bool {
        self.basis == VolatilityBasis::InsufficientData
    }
}

/// Valid closes needed for a measured estimate.
pub const MIN_CLOSES: usize = 3;

/// Trailing-window log-return volatility estimator.
#[derive(Debug, Clone)]
pub struct VolatilityEstimator {
    window: usize,
}

impl Default for VolatilityEstimator {
    fn default() -> Self {
        Self { window: 252 }
    }
}

impl VolatilityEstimator {
    /// `window` is the number of trailing closes considered (>= 3 to be useful).
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn estimate(&self, series: &PriceSeries) -> VolatilityEstimate {
        self.estimate_closes(series.trailing_closes(self.window))
    }

    /// Estimate from raw closes. Non-finite and non-positive values are dropped.
    pub fn estimate_closes(&self, closes: &[f64]) -> VolatilityEstimate {
        let start = closes.len().saturating_sub(self.window);
        let valid: Vec<f64> = closes[start..]
            .iter()
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
            .collect();

        if valid.len() < MIN_CLOSES {
            warn!(
                points = valid.len(),
                "volatility: fewer than {MIN_CLOSES} valid closes, reporting sigma = 0 (insufficient data)"
            );
            return VolatilityEstimate::insufficient();
        }

        let log_returns = log_returns(&valid);
        let sigma = sample_std(&log_returns);

        VolatilityEstimate {
            sigma,
            observations: log_returns.len(),
            basis: VolatilityBasis::Measured,
        }
    }
}

/// `ln(p_t / p_{t-1})` for consecutive closes.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

//! Weighted blend of forecast, fundamental and sentiment signals.
//!
//! Weights are applied as given. A missing signal contributes 0 but keeps
//! its weight, so the composite is not renormalized over the signals that
//! happen to be present.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::domain::{Recommendation, ScoreBreakdown, Signal};
use crate::signals::{forecast_signal, fundamental_signal, sentiment_signal, FundamentalRatios};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub forecast: f64,
    pub fundamental: f64,
    pub sentiment: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            forecast: 0.4,
            fundamental: 0.3,
            sentiment: 0.3,
        }
    }
}

/// Pure and total: every input combination yields a [`Recommendation`].
#[derive(Debug, Clone, Copy)]
pub struct CompositeScorer {
    weights: ScoreWeights,
    forecast_domain_pct: f64,
}

impl Default for CompositeScorer {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            forecast_domain_pct: 10.0,
        }
    }
}

impl CompositeScorer {
    pub fn new(weights: ScoreWeights, forecast_domain_pct: f64) -> Self {
        Self {
            weights,
            forecast_domain_pct,
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(
            ScoreWeights {
                forecast: config.forecast_weight,
                fundamental: config.fundamental_weight,
                sentiment: config.sentiment_weight,
            },
            config.forecast_domain_pct,
        )
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// Combine three already-normalized signals.
    pub fn score(&self, forecast: Signal, fundamental: Signal, sentiment: Signal) -> Recommendation {
        let composite = self.weights.forecast * forecast.value
            + self.weights.fundamental * fundamental.value
            + self.weights.sentiment * sentiment.value;
        Recommendation::new(
            composite,
            ScoreBreakdown {
                forecast,
                fundamental,
                sentiment,
            },
        )
    }

    /// Normalize raw inputs and score them. `projected_end` is the
    /// sentiment-adjusted median at the horizon end.
    pub fn score_raw(
        &self,
        last_price: f64,
        projected_end: f64,
        ratios: &FundamentalRatios,
        sentiment: f64,
    ) -> Recommendation {
        self.score(
            forecast_signal(last_price, projected_end, self.forecast_domain_pct),
            fundamental_signal(ratios),
            sentiment_signal(sentiment),
        )
    }
}

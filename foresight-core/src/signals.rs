//! Mapping raw fundamentals, sentiment and forecast moves onto [-1, 1].
//!
//! Missing or NaN raw input never errors: a single value normalizes to the
//! neutral 0, and the fundamental composite simply leaves missing ratios out
//! of its mean.

use serde::{Deserialize, Serialize};

use crate::domain::{Signal, SignalSource};
use crate::stats::mean;

/// Sentiment scores above this count as positive, below its negation as
/// negative.
pub const SENTIMENT_POLARITY_THRESHOLD: f64 = 0.1;

/// `clamp(2 * (raw - low) / (high - low) - 1, -1, 1)`.
///
/// NaN input and a degenerate domain (`high <= low`) both give 0.
pub fn normalize(raw: f64, low: f64, high: f64) -> f64 {
    if raw.is_nan() || !(high > low) {
        return 0.0;
    }
    (2.0 * (raw - low) / (high - low) - 1.0).clamp(-1.0, 1.0)
}

/// Fundamental ratios as reported, percentages in percent units
/// (`roe = 25.0` means 25%). Any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalRatios {
    /// Price / earnings.
    pub pe: Option<f64>,
    /// Return on equity, percent.
    pub roe: Option<f64>,
    /// Net profit margin, percent.
    pub profit_margin: Option<f64>,
    /// Debt / equity, percent.
    pub debt_to_equity: Option<f64>,
    /// Market beta. Drives trend flexibility, not the fundamental score.
    pub beta: Option<f64>,
}

impl FundamentalRatios {
    /// Each present, finite ratio normalized over its domain. Lower is better
    /// for valuation and leverage, so those are inverted first.
    pub fn normalized(&self) -> Vec<(&'static str, f64)> {
        let mut out = Vec::with_capacity(4);
        if let Some(pe) = present(self.pe) {
            out.push(("pe", normalize(40.0 - pe, -20.0, 40.0)));
        }
        if let Some(roe) = present(self.roe) {
            out.push(("roe", normalize(roe, 0.0, 25.0)));
        }
        if let Some(pm) = present(self.profit_margin) {
            out.push(("profit_margin", normalize(pm, 0.0, 30.0)));
        }
        if let Some(de) = present(self.debt_to_equity) {
            out.push(("debt_to_equity", normalize(200.0 - de, -100.0, 200.0)));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.normalized().is_empty()
    }
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Mean of the ratios that are present. All missing gives a neutral,
/// unavailable signal.
pub fn fundamental_signal(ratios: &FundamentalRatios) -> Signal {
    let values: Vec<f64> = ratios.normalized().into_iter().map(|(_, v)| v).collect();
    if values.is_empty() {
        return Signal::neutral(SignalSource::Fundamental);
    }
    Signal::new(SignalSource::Fundamental, mean(&values))
}

/// Sentiment is already in [-1, 1]; this is the identity normalization with
/// clamping and NaN handling.
pub fn sentiment_signal(sentiment: f64) -> Signal {
    if sentiment.is_nan() {
        return Signal::neutral(SignalSource::Sentiment);
    }
    Signal::new(SignalSource::Sentiment, normalize(sentiment, -1.0, 1.0))
}

/// Percent move from `last_price` to `projected_end`, normalized over
/// `(-domain_pct, +domain_pct)`.
pub fn forecast_signal(last_price: f64, projected_end: f64, domain_pct: f64) -> Signal {
    if !(last_price > 0.0) || !projected_end.is_finite() {
        return Signal::neutral(SignalSource::Forecast);
    }
    let pct = (projected_end - last_price) / last_price * 100.0;
    Signal::new(
        SignalSource::Forecast,
        normalize(pct, -domain_pct, domain_pct),
    )
}

/// Aggregate of per-item sentiment scores (e.g. one per headline).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Mean score, 0 when there are no scores.
    pub score: f64,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentSummary {
    /// NaN scores are ignored.
    pub fn from_scores(scores: &[f64]) -> Self {
        let valid: Vec<f64> = scores
            .iter()
            .copied()
            .filter(|s| !s.is_nan())
            .map(|s| s.clamp(-1.0, 1.0))
            .collect();
        let positive = valid
            .iter()
            .filter(|&&s| s > SENTIMENT_POLARITY_THRESHOLD)
            .count();
        let negative = valid
            .iter()
            .filter(|&&s| s < -SENTIMENT_POLARITY_THRESHOLD)
            .count();
        Self {
            score: mean(&valid),
            positive,
            negative,
            neutral: valid.len() - positive - negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

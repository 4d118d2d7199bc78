//! Signal: a bounded score contribution with a named source.

use serde::{Deserialize, Serialize};

/// Where a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Forecast,
    Fundamental,
    Sentiment,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Forecast => "forecast",
            SignalSource::Fundamental => "fundamental",
            SignalSource::Sentiment => "sentiment",
        }
    }
}

/// A scalar in [-1, 1].
///
/// `available` is false when the raw input was missing and the value was
/// replaced by the neutral 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub source: SignalSource,
    pub value: f64,
    pub available: bool,
}

impl Signal {
    /// Clamp `value` into [-1, 1]; a NaN value becomes a neutral signal.
    pub fn new(source: SignalSource, value: f64) -> Self {
        if value.is_nan() {
            return Self::neutral(source);
        }
        Self {
            source,
            value: value.clamp(-1.0, 1.0),
            available: true,
        }
    }

    pub fn neutral(source: SignalSource) -> Self {
        Self {
            source,
            value: 0.0,
            available: false,
        }
    }
}

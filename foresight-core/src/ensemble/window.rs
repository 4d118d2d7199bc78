//! Sliding-window plumbing shared by every ensemble model.
//!
//! Prices are min-max scaled to [0, 1] per call, cut into
//! `(window, next value)` training pairs, and forecasts are produced by
//! feeding each prediction back into the window.

use super::ModelError;

/// Per-call min-max scaler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    scale: f64,
}

impl MinMaxScaler {
    /// A zero-range input gets scale 1, so every value maps to 0.
    pub fn fit(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        let scale = if range > 0.0 && range.is_finite() { range } else { 1.0 };
        let min = if min.is_finite() { min } else { 0.0 };
        Self { min, scale }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.scale
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.scale + self.min
    }
}

/// Scaled history plus the scaler that produced it.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub scaler: MinMaxScaler,
    pub scaled: Vec<f64>,
}

/// Validate length and scale `closes`. At least `window + min_samples`
/// closes are needed so the model sees `min_samples` training pairs.
pub fn prepare(closes: &[f64], window: usize, min_samples: usize) -> Result<Prepared, ModelError> {
    let required = window + min_samples.max(1);
    if closes.len() < required {
        return Err(ModelError::InsufficientHistory {
            len: closes.len(),
            required,
        });
    }
    if let Some(index) = closes.iter().position(|c| !c.is_finite()) {
        return Err(ModelError::NonFinite { step: index });
    }
    let scaler = MinMaxScaler::fit(closes);
    let scaled = scaler.transform_all(closes);
    Ok(Prepared { scaler, scaled })
}

/// Training pairs: each row is `window` consecutive values, the target is
/// the value that follows.
pub fn supervised(scaled: &[f64], window: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    if scaled.len() <= window {
        return (Vec::new(), Vec::new());
    }
    let n = scaled.len() - window;
    let mut rows = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);
    for i in 0..n {
        rows.push(scaled[i..i + window].to_vec());
        targets.push(scaled[i + window]);
    }
    (rows, targets)
}

/// Roll a one-step predictor forward `horizon` steps, feeding predictions
/// back into the window. Returns scaled predictions.
pub fn roll_forward<F>(
    scaled: &[f64],
    window: usize,
    horizon: usize,
    mut predict: F,
) -> Result<Vec<f64>, ModelError>
where
    F: FnMut(&[f64]) -> Result<f64, ModelError>,
{
    let start = scaled.len().saturating_sub(window);
    let mut current: Vec<f64> = scaled[start..].to_vec();
    let mut out = Vec::with_capacity(horizon);
    for step in 0..horizon {
        let next = predict(&current)?;
        if !next.is_finite() {
            return Err(ModelError::NonFinite { step });
        }
        out.push(next);
        current.remove(0);
        current.push(next);
    }
    Ok(out)
}

/// Scaled predictions back to prices.
pub fn unscale(scaler: &MinMaxScaler, scaled: &[f64]) -> Vec<f64> {
    scaled.iter().map(|&v| scaler.inverse(v)).collect()
}

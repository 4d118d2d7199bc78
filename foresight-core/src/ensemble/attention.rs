//! Attention-based sequence model.
//!
//! Keys are every historical window of scaled closes, values are the change
//! that followed each window. A query window attends over the keys with a
//! softmax on negative mean squared distance, and the prediction is the last
//! value plus the attention-weighted change. The softmax temperature is
//! picked by one-step validation on the most recent fifth of the windows.

use super::window::{prepare, roll_forward, supervised, unscale};
use super::{ForecastModel, ModelError};

const TEMPERATURES: [f64; 3] = [0.001, 0.01, 0.1];
const MIN_SAMPLES: usize = 10;

#[derive(Debug, Clone)]
pub struct AttentionModel {
    window: usize,
}

impl AttentionModel {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

struct Memory<'a> {
    keys: &'a [Vec<f64>],
    values: Vec<f64>,
}

impl Memory<'_> {
    /// Attend over the first `limit` keys.
    fn attend(&self, query: &[f64], temperature: f64, limit: usize) -> f64 {
        let limit = limit.min(self.keys.len());
        if limit == 0 {
            return 0.0;
        }
        let width = query.len().max(1) as f64;
        let logits: Vec<f64> = self.keys[..limit]
            .iter()
            .map(|k| {
                let d: f64 = k.iter().zip(query).map(|(a, b)| (a - b).powi(2)).sum();
                -(d / width) / temperature
            })
            .collect();
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = weights.iter().sum();
        weights
            .iter()
            .zip(&self.values[..limit])
            .map(|(w, v)| w * v)
            .sum::<f64>()
            / total
    }

    /// One-step squared error on the windows from `split` onwards, attending
    /// only to earlier windows.
    fn validation_error(&self, temperature: f64, split: usize) -> f64 {
        (split..self.keys.len())
            .map(|i| (self.attend(&self.keys[i], temperature, i) - self.values[i]).powi(2))
            .sum()
    }
}

impl ForecastModel for AttentionModel {
    fn name(&self) -> &str {
        "attention"
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "neural")
    }

    fn forecast(&self, closes: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError> {
        let prepared = prepare(closes, self.window, MIN_SAMPLES)?;
        let (keys, targets) = supervised(&prepared.scaled, self.window);
        let values: Vec<f64> = keys
            .iter()
            .zip(&targets)
            .map(|(k, y)| y - k[k.len() - 1])
            .collect();
        let memory = Memory { keys: &keys, values };

        let split = (keys.len() * 4 / 5).max(1);
        let temperature = TEMPERATURES
            .iter()
            .copied()
            .map(|t| (t, memory.validation_error(t, split)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(TEMPERATURES[1], |(t, _)| t);

        let scaled = roll_forward(&prepared.scaled, self.window, horizon, |w| {
            Ok(w[w.len() - 1] + memory.attend(w, temperature, keys.len()))
        })?;
        Ok(unscale(&prepared.scaler, &scaled))
    }
}

//! Sequence-memory model: a leaky echo-state reservoir with a ridge readout.
//!
//! Each input window is streamed through a fixed random recurrent reservoir
//! starting from a zero state; the final state is the feature vector for a
//! linear readout predicting the next scaled close. Only the readout is
//! trained, so a fit is one ridge solve.

use ndarray::{s, Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::window::{prepare, roll_forward, supervised, unscale};
use super::{ForecastModel, ModelError};
use crate::linalg::ridge_solve;

const RESERVOIR_SIZE: usize = 50;
const LEAK_RATE: f64 = 0.3;
/// Row-sum bound on the recurrent matrix; keeps the spectral radius below 1.
const RECURRENT_NORM: f64 = 0.9;
const INPUT_SCALE: f64 = 1.0;
const READOUT_PENALTY: f64 = 1e-4;
const MIN_SAMPLES: usize = 10;

#[derive(Debug, Clone)]
pub struct ReservoirModel {
    window: usize,
    seed: u64,
}

impl ReservoirModel {
    pub fn new(window: usize, seed: u64) -> Self {
        Self { window, seed }
    }
}

/// Fixed random weights for one fit.
struct Reservoir {
    input: Array1<f64>,
    bias: Array1<f64>,
    recurrent: Array2<f64>,
}

impl Reservoir {
    fn random(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = RESERVOIR_SIZE;
        let input = Array1::from_shape_fn(n, |_| rng.gen_range(-0.5..0.5) * INPUT_SCALE);
        let bias = Array1::from_shape_fn(n, |_| rng.gen_range(-0.1..0.1));

        // Sparse recurrent weights (~20% connectivity).
        let mut recurrent = Array2::from_shape_fn((n, n), |_| {
            if rng.gen_bool(0.2) {
                rng.gen_range(-1.0..1.0)
            } else {
                0.0
            }
        });
        let max_row_sum = recurrent
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|w: &f64| w.abs()).sum::<f64>())
            .fold(0.0, f64::max);
        if max_row_sum > 0.0 {
            recurrent *= RECURRENT_NORM / max_row_sum;
        }

        Self {
            input,
            bias,
            recurrent,
        }
    }

    /// Final state after streaming `inputs` from a zero state, with a
    /// leading 1 for the readout intercept.
    fn features(&self, inputs: &[f64]) -> Array1<f64> {
        let mut state = Array1::<f64>::zeros(RESERVOIR_SIZE);
        for &u in inputs {
            let pre = &self.input * u + &self.bias + self.recurrent.dot(&state);
            state = state * (1.0 - LEAK_RATE) + pre.mapv(f64::tanh) * LEAK_RATE;
        }
        let mut out = Array1::ones(RESERVOIR_SIZE + 1);
        out.slice_mut(s![1..]).assign(&state);
        out
    }
}

impl ForecastModel for ReservoirModel {
    fn name(&self) -> &str {
        "reservoir"
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "neural")
    }

    fn forecast(&self, closes: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError> {
        let prepared = prepare(closes, self.window, MIN_SAMPLES)?;
        let (windows, targets) = supervised(&prepared.scaled, self.window);

        let reservoir = Reservoir::random(self.seed);
        let mut design = Array2::<f64>::zeros((windows.len(), RESERVOIR_SIZE + 1));
        for (i, w) in windows.iter().enumerate() {
            design.row_mut(i).assign(&reservoir.features(w));
        }

        let mut penalty = vec![READOUT_PENALTY; RESERVOIR_SIZE + 1];
        penalty[0] = 1e-9;
        let readout = ridge_solve(&design, &Array1::from(targets), &penalty)?;

        let scaled = roll_forward(&prepared.scaled, self.window, horizon, |w| {
            Ok(reservoir.features(w).dot(&readout))
        })?;
        Ok(unscale(&prepared.scaler, &scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_forecast() {
        let closes: Vec<f64> = (0..120).map(|i| 50.0 + (i as f64 * 0.2).sin() * 5.0).collect();
        let a = ReservoirModel::new(20, 9).forecast(&closes, 5).unwrap();
        let b = ReservoirModel::new(20, 9).forecast(&closes, 5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn tracks_a_smooth_level() {
        let closes: Vec<f64> = (0..150).map(|i| 100.0 + i as f64 * 0.1).collect();
        let path = ReservoirModel::new(20, 1).forecast(&closes, 3).unwrap();
        for p in path {
            assert!((p - 115.0).abs() < 5.0, "got {p}");
        }
    }

    #[test]
    fn short_history_is_an_error() {
        let err = ReservoirModel::new(60, 1).forecast(&[10.0; 30], 5).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientHistory { .. }));
    }

    #[test]
    fn availability_follows_feature() {
        assert_eq!(
            ReservoirModel::new(60, 1).is_available(),
            cfg!(feature = "neural")
        );
    }
}

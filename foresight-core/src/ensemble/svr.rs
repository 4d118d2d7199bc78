//! Epsilon-SVR with an RBF kernel on lagged scaled closes, fitted by
//! `linfa-svm`.
//!
//! `C = 500`, `gamma = 0.001`, tube half-width `epsilon = 0.01`. linfa
//! writes the Gaussian kernel as `exp(-|x - y|^2 / eps)`, so the kernel
//! width passed in is `1 / gamma`.

use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_svm::Svm;
use ndarray::{Array1, Array2};

use super::window::{prepare, roll_forward, supervised, unscale};
use super::{ForecastModel, ModelError};

const C: f64 = 500.0;
const GAMMA: f64 = 0.001;
const EPSILON: f64 = 0.01;
const MIN_SAMPLES: usize = 5;
/// Most recent training pairs kept; SMO cost grows quadratically in this.
const MAX_SAMPLES: usize = 400;

#[derive(Debug, Clone)]
pub struct SvrModel {
    window: usize,
}

impl SvrModel {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

fn records(rows: &[Vec<f64>], width: usize) -> Result<Array2<f64>, ModelError> {
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), width), flat)
        .map_err(|e| ModelError::Other(format!("svr records: {e}")))
}

impl ForecastModel for SvrModel {
    fn name(&self) -> &str {
        "svr"
    }

    fn forecast(&self, closes: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError> {
        let prepared = prepare(closes, self.window, MIN_SAMPLES)?;

        // A flat history scales to all zeros; its level is the forecast.
        if prepared.scaled.iter().all(|&v| v == 0.0) {
            return Ok(vec![prepared.scaler.inverse(0.0); horizon]);
        }

        let (mut rows, mut targets) = supervised(&prepared.scaled, self.window);
        if rows.len() > MAX_SAMPLES {
            let drop = rows.len() - MAX_SAMPLES;
            rows.drain(..drop);
            targets.drain(..drop);
        }

        let dataset = DatasetBase::new(records(&rows, self.window)?, Array1::from(targets));
        let model = Svm::<f64, f64>::params()
            .c_svr(C, Some(EPSILON))
            .gaussian_kernel(1.0 / GAMMA)
            .fit(&dataset)
            .map_err(|e| ModelError::Other(format!("svr fit: {e}")))?;

        let scaled = roll_forward(&prepared.scaled, self.window, horizon, |w| {
            let x = records(&[w.to_vec()], w.len())?;
            let y: Array1<f64> = model.predict(&x);
            y.get(0)
                .copied()
                .ok_or_else(|| ModelError::Other("svr returned no prediction".into()))
        })?;
        Ok(unscale(&prepared.scaler, &scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_series_forecasts_constant() {
        let path = SvrModel::new(10).forecast(&[12.5; 40], 5).unwrap();
        assert_eq!(path, vec![12.5; 5]);
    }

    #[test]
    fn oscillating_series_stays_within_its_band() {
        let closes: Vec<f64> = (0..120).map(|i| 50.0 + 5.0 * (i as f64 * 0.2).sin()).collect();
        let path = SvrModel::new(10).forecast(&closes, 5).unwrap();
        assert_eq!(path.len(), 5);
        for (t, p) in path.iter().enumerate() {
            assert!(p.is_finite() && (40.0..=60.0).contains(p), "step {t}: {p}");
        }
    }

    #[test]
    fn rising_series_keeps_rising() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let path = SvrModel::new(10).forecast(&closes, 3).unwrap();
        assert!(path[0] > 180.0, "first step {}", path[0]);
    }

    #[test]
    fn short_history_is_an_error() {
        let err = SvrModel::new(10).forecast(&[10.0; 12], 5).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InsufficientHistory { len: 12, required: 15 }
        ));
    }
}

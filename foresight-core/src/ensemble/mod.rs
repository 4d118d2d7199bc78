//! Ensemble of independent point-forecast models.
//!
//! Every model implements [`ForecastModel`]: it is fit from scratch on the
//! closes it is handed and returns one predicted price per horizon day. The
//! bank runs each available model in isolation. An error, a panic, a
//! wrong-length or non-finite path all degrade to the flat fallback (last
//! close repeated) with a [`ModelStatus::Fallback`] tag, so a genuinely flat
//! prediction stays distinguishable from a failure.

pub mod attention;
pub mod boosted_trees;
pub mod reservoir;
pub mod svr;
pub mod window;

pub use attention::AttentionModel;
pub use boosted_trees::BoostedTreesModel;
pub use reservoir::ReservoirModel;
pub use svr::SvrModel;

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EnsembleConfig;
use crate::domain::PriceSeries;
use crate::linalg::LinalgError;
use crate::rng::SeedHierarchy;

/// Why one model could not produce a genuine forecast.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("insufficient history: {len} closes, need {required}")]
    InsufficientHistory { len: usize, required: usize },

    #[error("non-finite value at step {step}")]
    NonFinite { step: usize },

    #[error("non-positive price at step {step}")]
    NonPositive { step: usize },

    #[error("expected {expected} predictions, got {got}")]
    WrongLength { expected: usize, got: usize },

    #[error("solver failed: {0}")]
    Solve(#[from] LinalgError),

    #[error("model panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

/// A capability-checked forecasting strategy.
pub trait ForecastModel: Send + Sync {
    /// Stable identifier, used as the key in [`ForecastResult`].
    fn name(&self) -> &str;

    /// Whether the model can run in this build.
    fn is_available(&self) -> bool {
        true
    }

    /// Predict `horizon` prices following `closes`.
    fn forecast(&self, closes: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError>;
}

/// How a model's path was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelStatus {
    /// The model's own prediction.
    Fitted,
    /// The model failed; the path is the flat fallback.
    Fallback { reason: String },
    /// The model is not available in this build; the path is the flat fallback.
    Unavailable,
}

impl ModelStatus {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, ModelStatus::Fitted)
    }
}

/// One model's path and status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelForecast {
    pub model: String,
    pub path: Vec<f64>,
    pub status: ModelStatus,
}

/// Per-model paths, in bank order. Every path has exactly `horizon` values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub horizon: usize,
    pub last_price: f64,
    pub models: Vec<ModelForecast>,
}

impl ForecastResult {
    pub fn get(&self, model: &str) -> Option<&ModelForecast> {
        self.models.iter().find(|m| m.model == model)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelForecast> {
        self.models.iter()
    }

    pub fn fitted_count(&self) -> usize {
        self.models.iter().filter(|m| !m.status.is_fallback()).count()
    }

    /// Per-day mean across genuinely fitted models. `None` when every model
    /// fell back.
    pub fn consensus(&self) -> Option<Vec<f64>> {
        let fitted: Vec<&ModelForecast> = self
            .models
            .iter()
            .filter(|m| !m.status.is_fallback())
            .collect();
        if fitted.is_empty() {
            return None;
        }
        let n = fitted.len() as f64;
        Some(
            (0..self.horizon)
                .map(|t| fitted.iter().map(|m| m.path[t]).sum::<f64>() / n)
                .collect(),
        )
    }
}

/// Runs every registered model on the same closes.
pub struct EnsembleForecastBank {
    models: Vec<Box<dyn ForecastModel>>,
    max_history: usize,
    parallel: bool,
}

impl Default for EnsembleForecastBank {
    fn default() -> Self {
        Self::empty(500)
    }
}

impl std::fmt::Debug for EnsembleForecastBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.models.iter().map(|m| m.name()).collect();
        f.debug_struct("EnsembleForecastBank")
            .field("models", &names)
            .field("max_history", &self.max_history)
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl EnsembleForecastBank {
    /// A bank with no models.
    pub fn empty(max_history: usize) -> Self {
        Self {
            models: Vec::new(),
            max_history,
            parallel: true,
        }
    }

    /// The four built-in models. Seeded models draw from `seeds`.
    pub fn with_default_models(config: &EnsembleConfig, seeds: &SeedHierarchy) -> Self {
        let mut bank = Self::empty(config.max_history);
        bank.parallel = config.parallel;
        bank.push(ReservoirModel::new(
            config.reservoir_window,
            seeds.sub_seed("reservoir", 0),
        ));
        bank.push(BoostedTreesModel::new(
            config.boosted_trees_window,
            seeds.sub_seed("boosted_trees", 0),
        ));
        bank.push(SvrModel::new(config.svr_window));
        bank.push(AttentionModel::new(config.attention_window));
        bank
    }

    pub fn push<M: ForecastModel + 'static>(&mut self, model: M) {
        self.models.push(Box::new(model));
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Forecast `horizon` days with every model. Never fails: models that
    /// cannot run get the flat fallback.
    pub fn forecast(&self, series: &PriceSeries, horizon: usize) -> ForecastResult {
        let closes = series.trailing_closes(self.max_history);
        let last_price = series.last_price();

        let models: Vec<ModelForecast> = if self.parallel {
            self.models
                .par_iter()
                .map(|m| run_isolated(m.as_ref(), closes, horizon, last_price))
                .collect()
        } else {
            self.models
                .iter()
                .map(|m| run_isolated(m.as_ref(), closes, horizon, last_price))
                .collect()
        };

        ForecastResult {
            horizon,
            last_price,
            models,
        }
    }
}

fn run_isolated(
    model: &dyn ForecastModel,
    closes: &[f64],
    horizon: usize,
    last_price: f64,
) -> ModelForecast {
    let name = model.name().to_string();

    if !model.is_available() {
        debug!(model = %name, "model unavailable, using flat fallback");
        return ModelForecast {
            model: name,
            path: vec![last_price; horizon],
            status: ModelStatus::Unavailable,
        };
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| model.forecast(closes, horizon)))
        .unwrap_or_else(|payload| Err(ModelError::Panicked(panic_message(payload.as_ref()))))
        .and_then(|path| validate_path(path, horizon));

    match outcome {
        Ok(path) => {
            debug!(model = %name, horizon, "model fitted");
            ModelForecast {
                model: name,
                path,
                status: ModelStatus::Fitted,
            }
        }
        Err(err) => {
            warn!(model = %name, error = %err, "model failed, using flat fallback");
            ModelForecast {
                model: name,
                path: vec![last_price; horizon],
                status: ModelStatus::Fallback {
                    reason: err.to_string(),
                },
            }
        }
    }
}

fn validate_path(path: Vec<f64>, horizon: usize) -> Result<Vec<f64>, ModelError> {
    if path.len() != horizon {
        return Err(ModelError::WrongLength {
            expected: horizon,
            got: path.len(),
        });
    }
    for (step, &v) in path.iter().enumerate() {
        if !v.is_finite() {
            return Err(ModelError::NonFinite { step });
        }
        if v <= 0.0 {
            return Err(ModelError::NonPositive { step });
        }
    }
    Ok(path)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

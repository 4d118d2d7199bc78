//! Foresight Core: price-series forecasting and recommendation engine.
//!
//! This crate contains:
//! - Domain types (price series, signals, recommendations)
//! - Volatility and trend estimation
//! - Monte Carlo path simulation with a sentiment overlay
//! - A bank of independent forecast models with per-model fallback
//! - Signal normalization and composite scoring
//! - Provider traits for price history, sentiment and fundamentals
//! - Descriptive analytics (indicators, summaries, correlation, movers)

pub mod analytics;
pub mod config;
pub mod domain;
pub mod ensemble;
pub mod linalg;
pub mod pipeline;
pub mod provider;
pub mod rng;
pub mod scorer;
pub mod signals;
pub mod simulation;
mod stats;
pub mod trend;
pub mod volatility;

pub use config::{AnalysisConfig, ConfigError};
pub use domain::{Action, PricePoint, PriceSeries, Recommendation, SeriesError, Signal, SignalSource};
pub use ensemble::{EnsembleForecastBank, ForecastModel, ForecastResult, ModelError, ModelStatus};
pub use pipeline::{ensemble_forecast, recommend, simulate, Analysis, AnalysisError, Forecaster};
pub use provider::{BarInterval, DataError, FundamentalsProvider, PriceHistoryProvider, SentimentProvider};
pub use scorer::{CompositeScorer, ScoreWeights};
pub use signals::{FundamentalRatios, SentimentSummary};
pub use simulation::{MonteCarloSimulator, SentimentAdjustment, SimulationBundle};
pub use trend::{Flexibility, TrendEstimator, TrendProjection};
pub use volatility::{VolatilityEstimate, VolatilityEstimator};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: engine types can cross threads, so callers may
    /// run analyses from worker pools.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<Recommendation>();
        require_sync::<Recommendation>();
        require_send::<SimulationBundle>();
        require_sync::<SimulationBundle>();
        require_send::<ForecastResult>();
        require_sync::<ForecastResult>();
        require_send::<Analysis>();
        require_sync::<Analysis>();

        require_send::<Forecaster>();
        require_sync::<Forecaster>();
        require_send::<EnsembleForecastBank>();
        require_sync::<EnsembleForecastBank>();
        require_send::<rng::SeedHierarchy>();
        require_sync::<rng::SeedHierarchy>();

        require_send::<provider::StaticMarketData>();
        require_sync::<provider::StaticMarketData>();
        require_send::<provider::InMemoryPriceCache>();
        require_sync::<provider::InMemoryPriceCache>();
    }

    /// Architecture contract: a forecast model sees only closes and a
    /// horizon, never another model's output or the composite score.
    #[test]
    fn forecast_model_trait_sees_only_closes() {
        fn _check_trait_object_builds(
            model: &dyn ForecastModel,
            closes: &[f64],
        ) -> Result<Vec<f64>, ModelError> {
            model.forecast(closes, 5)
        }
    }
}

//! Entry points: simulate, ensemble forecast, recommend, full analysis.
//!
//! Flow: series -> {volatility, trend} -> Monte Carlo -> sentiment-adjusted
//! median -> composite score, with the ensemble and descriptive analytics
//! reported alongside. Only input errors (bad series, bad config, missing
//! history) reach the caller; everything downstream degrades to fallbacks.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::analytics::{MarketSummary, TechnicalSnapshot};
use crate::config::{AnalysisConfig, ConfigError};
use crate::domain::{PriceSeries, Recommendation, SeriesError};
use crate::ensemble::{EnsembleForecastBank, ForecastResult};
use crate::provider::{DataError, FundamentalsProvider, PriceHistoryProvider, SentimentProvider};
use crate::rng::SeedHierarchy;
use crate::scorer::CompositeScorer;
use crate::signals::{FundamentalRatios, SentimentSummary};
use crate::simulation::{
    MonteCarloSimulator, PercentileBands, ProjectionLines, SentimentAdjustment, SimulationBundle,
};
use crate::trend::{Flexibility, TrendEstimator, TrendProjection};
use crate::volatility::{VolatilityEstimate, VolatilityEstimator};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid price series: {0}")]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Deterministic trend path, as reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPath {
    pub flexibility: Flexibility,
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
    pub projection: TrendProjection,
    /// False when the fit failed and a flat projection was used instead.
    pub fitted: bool,
}

/// Everything one `analyze` call produces.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub last_date: NaiveDate,
    pub last_price: f64,
    pub horizon: usize,
    pub seed: u64,
    pub volatility: VolatilityEstimate,
    pub trend: TrendPath,
    pub bands: PercentileBands,
    pub lines: ProjectionLines,
    pub ensemble: ForecastResult,
    pub recommendation: Recommendation,
    pub summary: MarketSummary,
    pub technicals: TechnicalSnapshot,
}

/// Projection stages shared by `simulate`, `recommend` and `analyze`.
struct Projection {
    volatility: VolatilityEstimate,
    trend: TrendPath,
    bundle: SimulationBundle,
}

/// Runs the pipeline under one [`AnalysisConfig`].
#[derive(Debug, Clone, Default)]
pub struct Forecaster {
    config: AnalysisConfig,
}

impl Forecaster {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn check(&self, series: &PriceSeries) -> Result<(), SeriesError> {
        series.require_len(self.config.min_history)
    }

    fn flexibility(&self, beta: Option<f64>) -> Flexibility {
        self.config
            .trend
            .flexibility
            .unwrap_or_else(|| Flexibility::from_beta(beta))
    }

    fn trend_path(&self, series: &PriceSeries, horizon: usize, beta: Option<f64>) -> TrendPath {
        let flexibility = self.flexibility(beta);
        let estimator = TrendEstimator::new(flexibility, &self.config.trend);
        match estimator.project(series, horizon) {
            Ok(forecast) => TrendPath {
                flexibility,
                dates: forecast.dates,
                prices: forecast.prices,
                projection: forecast.projection,
                fitted: true,
            },
            Err(err) => {
                warn!(error = %err, "trend fit failed, projecting flat");
                let last = series.last_date();
                TrendPath {
                    flexibility,
                    dates: (1..=horizon as i64)
                        .map(|k| last + chrono::Duration::days(k))
                        .collect(),
                    prices: vec![series.last_price(); horizon],
                    projection: TrendProjection::flat(horizon),
                    fitted: false,
                }
            }
        }
    }

    fn project(
        &self,
        series: &PriceSeries,
        horizon: usize,
        path_count: usize,
        seed: Option<u64>,
        beta: Option<f64>,
    ) -> Result<Projection, AnalysisError> {
        self.check(series)?;
        let volatility = VolatilityEstimator::new(self.config.volatility.window).estimate(series);
        let trend = self.trend_path(series, horizon, beta);
        let simulator = MonteCarloSimulator::new(path_count, seed);
        let bundle = simulator.simulate(series.last_price(), &trend.projection, &volatility);
        Ok(Projection {
            volatility,
            trend,
            bundle,
        })
    }

    /// Monte Carlo bundle around the trend projection.
    pub fn simulate(
        &self,
        series: &PriceSeries,
        horizon: usize,
        path_count: usize,
        seed: Option<u64>,
    ) -> Result<SimulationBundle, AnalysisError> {
        Ok(self.project(series, horizon, path_count, seed, None)?.bundle)
    }

    /// One path per ensemble model, each tagged fitted or fallback.
    pub fn ensemble_forecast(
        &self,
        series: &PriceSeries,
        horizon: usize,
    ) -> Result<ForecastResult, AnalysisError> {
        self.check(series)?;
        let seeds = SeedHierarchy::from_optional(self.config.seed);
        Ok(self.bank(&seeds).forecast(series, horizon))
    }

    fn bank(&self, seeds: &SeedHierarchy) -> EnsembleForecastBank {
        EnsembleForecastBank::with_default_models(&self.config.ensemble, seeds)
    }

    fn lines(&self, series: &PriceSeries, bundle: &SimulationBundle, sentiment: f64) -> ProjectionLines {
        SentimentAdjustment::new(self.config.sentiment.drift_scale).apply(
            series.last_price(),
            &bundle.median(),
            sentiment,
        )
    }

    fn score(
        &self,
        series: &PriceSeries,
        lines: &ProjectionLines,
        fundamentals: &FundamentalRatios,
        sentiment: f64,
    ) -> Recommendation {
        let last = series.last_price();
        let end = lines.adjusted_end().unwrap_or(last);
        CompositeScorer::from_config(&self.config.scoring).score_raw(last, end, fundamentals, sentiment)
    }

    /// Discrete recommendation from price history, fundamentals and a
    /// sentiment scalar in [-1, 1].
    pub fn recommend(
        &self,
        series: &PriceSeries,
        fundamentals: &FundamentalRatios,
        sentiment: f64,
        horizon: usize,
    ) -> Result<Recommendation, AnalysisError> {
        let projection = self.project(
            series,
            horizon,
            self.config.path_count,
            self.config.seed,
            fundamentals.beta,
        )?;
        let lines = self.lines(series, &projection.bundle, sentiment);
        let rec = self.score(series, &lines, fundamentals, sentiment);
        info!(
            action = %rec.action(),
            composite = rec.composite(),
            "recommendation ready"
        );
        Ok(rec)
    }

    /// Full report: projection, bands, ensemble, recommendation and
    /// descriptive analytics, for the configured horizon.
    pub fn analyze(
        &self,
        series: &PriceSeries,
        fundamentals: &FundamentalRatios,
        sentiment: SentimentSummary,
    ) -> Result<Analysis, AnalysisError> {
        let horizon = self.config.horizon;
        let seeds = SeedHierarchy::from_optional(self.config.seed);
        let seed = seeds.master_seed();

        let projection = self.project(
            series,
            horizon,
            self.config.path_count,
            Some(seed),
            fundamentals.beta,
        )?;
        let lines = self.lines(series, &projection.bundle, sentiment.score);
        let recommendation = self.score(series, &lines, fundamentals, sentiment.score);
        let ensemble = self.bank(&seeds).forecast(series, horizon);

        info!(
            points = series.len(),
            horizon,
            seed,
            fitted_models = ensemble.fitted_count(),
            action = %recommendation.action(),
            "analysis complete"
        );

        Ok(Analysis {
            last_date: series.last_date(),
            last_price: series.last_price(),
            horizon,
            seed,
            volatility: projection.volatility,
            trend: projection.trend,
            bands: projection.bundle.bands(),
            lines,
            ensemble,
            recommendation,
            summary: MarketSummary::new(series, sentiment),
            technicals: TechnicalSnapshot::latest(series),
        })
    }

    /// Fetch history, sentiment and fundamentals for `symbol` and recommend.
    /// Empty history stops before any computation.
    pub fn recommend_symbol(
        &self,
        symbol: &str,
        prices: &dyn PriceHistoryProvider,
        sentiment: &dyn SentimentProvider,
        fundamentals: &dyn FundamentalsProvider,
    ) -> Result<Recommendation, AnalysisError> {
        let series = prices.price_history(symbol, self.config.lookback_days, self.config.interval)?;
        self.check(&series)?;
        let score = sentiment.sentiment(symbol)?;
        let ratios = fundamentals.fundamentals(symbol)?;
        info!(symbol, provider = prices.name(), points = series.len(), "history loaded");
        self.recommend(&series, &ratios, score, self.config.horizon)
    }
}

/// [`Forecaster::simulate`] with default settings.
pub fn simulate(
    series: &PriceSeries,
    horizon: usize,
    path_count: usize,
    seed: Option<u64>,
) -> Result<SimulationBundle, AnalysisError> {
    Forecaster::default().simulate(series, horizon, path_count, seed)
}

/// [`Forecaster::ensemble_forecast`] with default settings.
pub fn ensemble_forecast(series: &PriceSeries, horizon: usize) -> Result<ForecastResult, AnalysisError> {
    Forecaster::default().ensemble_forecast(series, horizon)
}

/// [`Forecaster::recommend`] with default settings.
pub fn recommend(
    series: &PriceSeries,
    fundamentals: &FundamentalRatios,
    sentiment: f64,
    horizon: usize,
) -> Result<Recommendation, AnalysisError> {
    Forecaster::default().recommend(series, fundamentals, sentiment, horizon)
}

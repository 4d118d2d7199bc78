//! Serializable analysis configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! horizon = 30
//! path_count = 100
//! seed = 42
//!
//! [trend]
//! flexibility = "high"
//!
//! [scoring]
//! forecast_weight = 0.4
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::provider::BarInterval;
use crate::trend::Flexibility;
use crate::volatility::MIN_CLOSES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Forecast horizon in calendar days.
    pub horizon: usize,
    /// Monte Carlo path count.
    pub path_count: usize,
    /// Master seed. `None` draws a fresh seed per invocation.
    pub seed: Option<u64>,
    /// Shorter series are rejected as input errors.
    pub min_history: usize,
    /// Calendar days of history requested from a price provider.
    pub lookback_days: u32,
    pub interval: BarInterval,
    pub volatility: VolatilityConfig,
    pub trend: TrendConfig,
    pub sentiment: SentimentConfig,
    pub scoring: ScoringConfig,
    pub ensemble: EnsembleConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            horizon: 30,
            path_count: 100,
            seed: None,
            min_history: 30,
            lookback_days: 730,
            interval: BarInterval::Daily,
            volatility: VolatilityConfig::default(),
            trend: TrendConfig::default(),
            sentiment: SentimentConfig::default(),
            scoring: ScoringConfig::default(),
            ensemble: EnsembleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Trailing closes used for the log-return standard deviation.
    pub window: usize,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self { window: 252 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Fixed flexibility tier. When unset the tier is derived from beta.
    pub flexibility: Option<Flexibility>,
    pub n_changepoints: usize,
    /// Fraction of the history (from the start) eligible for changepoints.
    pub changepoint_range: f64,
    /// Fourier order of the weekly term (0 disables it).
    pub weekly_order: usize,
    /// Fourier order of the yearly term (0 disables it).
    pub yearly_order: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            flexibility: None,
            n_changepoints: 25,
            changepoint_range: 0.8,
            weekly_order: 3,
            yearly_order: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Largest fraction of the last price that sentiment can add to the
    /// horizon-end median (`k`).
    pub drift_scale: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self { drift_scale: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub forecast_weight: f64,
    pub fundamental_weight: f64,
    pub sentiment_weight: f64,
    /// Forecast percent change mapped to -1 / +1 at `-domain` / `+domain`.
    pub forecast_domain_pct: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            forecast_weight: 0.4,
            fundamental_weight: 0.3,
            sentiment_weight: 0.3,
            forecast_domain_pct: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Most recent closes each model trains on.
    pub max_history: usize,
    pub reservoir_window: usize,
    pub boosted_trees_window: usize,
    pub svr_window: usize,
    pub attention_window: usize,
    /// Run models on the rayon pool.
    pub parallel: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            max_history: 500,
            reservoir_window: 60,
            boosted_trees_window: 10,
            svr_window: 10,
            attention_window: 20,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::Invalid("horizon must be > 0".into()));
        }
        if self.path_count == 0 {
            return Err(ConfigError::Invalid("path_count must be > 0".into()));
        }
        if self.min_history < 2 {
            return Err(ConfigError::Invalid("min_history must be >= 2".into()));
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::Invalid("lookback_days must be > 0".into()));
        }
        if self.volatility.window < MIN_CLOSES {
            return Err(ConfigError::Invalid(format!(
                "volatility.window must be >= {MIN_CLOSES}"
            )));
        }
        if !(0.0..=1.0).contains(&self.trend.changepoint_range) {
            return Err(ConfigError::Invalid(
                "trend.changepoint_range must be within [0, 1]".into(),
            ));
        }
        if !self.sentiment.drift_scale.is_finite() || self.sentiment.drift_scale < 0.0 {
            return Err(ConfigError::Invalid(
                "sentiment.drift_scale must be finite and >= 0".into(),
            ));
        }
        let s = &self.scoring;
        for (name, w) in [
            ("forecast_weight", s.forecast_weight),
            ("fundamental_weight", s.fundamental_weight),
            ("sentiment_weight", s.sentiment_weight),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "scoring.{name} must be finite and >= 0"
                )));
            }
        }
        if !(s.forecast_domain_pct > 0.0) {
            return Err(ConfigError::Invalid(
                "scoring.forecast_domain_pct must be > 0".into(),
            ));
        }
        let e = &self.ensemble;
        for (name, w) in [
            ("reservoir_window", e.reservoir_window),
            ("boosted_trees_window", e.boosted_trees_window),
            ("svr_window", e.svr_window),
            ("attention_window", e.attention_window),
        ] {
            if w == 0 {
                return Err(ConfigError::Invalid(format!("ensemble.{name} must be > 0")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = AnalysisConfig::from_toml("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.horizon, 30);
        assert_eq!(config.path_count, 100);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn partial_sections_override_defaults() {
        let config = AnalysisConfig::from_toml(
            r#"
horizon = 10
seed = 7
interval = "weekly"

[trend]
flexibility = "high"

[scoring]
forecast_weight = 0.5
"#,
        )
        .unwrap();
        assert_eq!(config.horizon, 10);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.interval, BarInterval::Weekly);
        assert_eq!(config.lookback_days, 730);
        assert_eq!(config.trend.flexibility, Some(Flexibility::High));
        assert_eq!(config.trend.n_changepoints, 25);
        assert_eq!(config.scoring.forecast_weight, 0.5);
        assert_eq!(config.scoring.sentiment_weight, 0.3);
    }

    #[test]
    fn zero_horizon_is_invalid() {
        let err = AnalysisConfig::from_toml("horizon = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn negative_weight_is_invalid() {
        let err = AnalysisConfig::from_toml("[scoring]\nsentiment_weight = -0.1").unwrap_err();
        assert!(err.to_string().contains("sentiment_weight"));
    }

    #[test]
    fn two_close_volatility_window_is_invalid() {
        let err = AnalysisConfig::from_toml("[volatility]\nwindow = 2").unwrap_err();
        assert!(err.to_string().contains("volatility.window must be >= 3"));
        assert!(AnalysisConfig::from_toml("[volatility]\nwindow = 3").is_ok());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = AnalysisConfig::from_toml("horizon = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AnalysisConfig::from_file(Path::new("/nonexistent/foresight.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn serialization_roundtrip() {
        let mut config = AnalysisConfig::default();
        config.seed = Some(99);
        let text = toml::to_string(&config).unwrap();
        let back = AnalysisConfig::from_toml(&text).unwrap();
        assert_eq!(config, back);
    }
}

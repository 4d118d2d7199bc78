//! Descriptive analytics reported next to a forecast.

pub mod compare;
pub mod correlation;
pub mod indicators;
pub mod movers;
pub mod summary;

pub use compare::FundamentalComparison;
pub use correlation::{return_correlation, CorrelationMatrix};
pub use indicators::{bollinger, macd, BollingerBands, Ema, Indicator, Macd, Rsi, TechnicalSnapshot};
pub use movers::{top_movers, Mover, Movers};
pub use summary::{MarketSummary, RiskLevel, Tone, TrendDirection};

//! Collaborator boundary: where prices, sentiment and fundamentals come from.
//!
//! Providers are traits so the CLI can plug in CSV files and tests can plug
//! in fixtures. Caching is an explicit collaborator wrapped around a price
//! provider, never process-global state.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Datelike, Duration};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{PricePoint, PriceSeries, SeriesError};
use crate::signals::FundamentalRatios;

/// Bar spacing requested from a price provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarInterval {
    #[default]
    Daily,
    /// Last close of each ISO week.
    Weekly,
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no price history for symbol '{symbol}'")]
    EmptyHistory { symbol: String },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("invalid price history for '{symbol}': {source}")]
    InvalidSeries {
        symbol: String,
        #[source]
        source: SeriesError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Daily (or weekly) close history for a symbol.
pub trait PriceHistoryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Closes covering the last `lookback_days` calendar days of available
    /// history. An empty result is [`DataError::EmptyHistory`], never an
    /// empty or zero-filled series.
    fn price_history(
        &self,
        symbol: &str,
        lookback_days: u32,
        interval: BarInterval,
    ) -> Result<PriceSeries, DataError>;
}

/// Aggregate sentiment in [-1, 1]; 0 when there is nothing to score.
pub trait SentimentProvider: Send + Sync {
    fn name(&self) -> &str;

    fn sentiment(&self, symbol: &str) -> Result<f64, DataError>;
}

pub trait FundamentalsProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fundamentals(&self, symbol: &str) -> Result<FundamentalRatios, DataError>;
}

/// Keep the points within `lookback_days` of the last observation, then
/// resample to `interval`.
pub fn window_series(
    series: &PriceSeries,
    lookback_days: u32,
    interval: BarInterval,
) -> Result<PriceSeries, SeriesError> {
    let cutoff = series.last_date() - Duration::days(i64::from(lookback_days));
    let points: Vec<PricePoint> = series.points().filter(|p| p.date > cutoff).collect();
    let points = match interval {
        BarInterval::Daily => points,
        BarInterval::Weekly => last_of_each_week(points),
    };
    PriceSeries::new(points)
}

fn last_of_each_week(points: Vec<PricePoint>) -> Vec<PricePoint> {
    let mut out: Vec<PricePoint> = Vec::new();
    for point in points {
        let week = point.date.iso_week();
        match out.last_mut() {
            Some(last) if last.date.iso_week() == week => *last = point,
            _ => out.push(point),
        }
    }
    out
}

/// Fixture-style provider backed by maps. Serves all three collaborator
/// traits.
#[derive(Debug, Default, Clone)]
pub struct StaticMarketData {
    prices: HashMap<String, PriceSeries>,
    sentiment: HashMap<String, f64>,
    fundamentals: HashMap<String, FundamentalRatios>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(mut self, symbol: &str, series: PriceSeries) -> Self {
        self.prices.insert(symbol.to_string(), series);
        self
    }

    pub fn with_sentiment(mut self, symbol: &str, score: f64) -> Self {
        self.sentiment.insert(symbol.to_string(), score);
        self
    }

    pub fn with_fundamentals(mut self, symbol: &str, ratios: FundamentalRatios) -> Self {
        self.fundamentals.insert(symbol.to_string(), ratios);
        self
    }
}

impl PriceHistoryProvider for StaticMarketData {
    fn name(&self) -> &str {
        "static"
    }

    fn price_history(
        &self,
        symbol: &str,
        lookback_days: u32,
        interval: BarInterval,
    ) -> Result<PriceSeries, DataError> {
        let series = self
            .prices
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        window_series(series, lookback_days, interval).map_err(|source| match source {
            SeriesError::Empty => DataError::EmptyHistory {
                symbol: symbol.to_string(),
            },
            source => DataError::InvalidSeries {
                symbol: symbol.to_string(),
                source,
            },
        })
    }
}

impl SentimentProvider for StaticMarketData {
    fn name(&self) -> &str {
        "static"
    }

    /// Unknown symbols have no text to score, so they read as neutral.
    fn sentiment(&self, symbol: &str) -> Result<f64, DataError> {
        Ok(self.sentiment.get(symbol).copied().unwrap_or(0.0))
    }
}

impl FundamentalsProvider for StaticMarketData {
    fn name(&self) -> &str {
        "static"
    }

    fn fundamentals(&self, symbol: &str) -> Result<FundamentalRatios, DataError> {
        Ok(self.fundamentals.get(symbol).copied().unwrap_or_default())
    }
}

/// Key for a cached price request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub lookback_days: u32,
    pub interval: BarInterval,
}

/// Storage for previously fetched price histories.
pub trait PriceCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<PriceSeries>;
    fn put(&self, key: CacheKey, series: PriceSeries);
}

/// Process-local cache behind a read-write lock.
#[derive(Debug, Default)]
pub struct InMemoryPriceCache {
    entries: RwLock<HashMap<CacheKey, PriceSeries>>,
}

impl InMemoryPriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PriceCache for InMemoryPriceCache {
    fn get(&self, key: &CacheKey) -> Option<PriceSeries> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn put(&self, key: CacheKey, series: PriceSeries) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, series);
        }
    }
}

/// Read-through cache in front of a price provider. Errors are not cached.
pub struct CachedPriceProvider<P, C> {
    inner: P,
    cache: C,
}

impl<P: PriceHistoryProvider, C: PriceCache> CachedPriceProvider<P, C> {
    pub fn new(inner: P, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<P: PriceHistoryProvider, C: PriceCache> PriceHistoryProvider for CachedPriceProvider<P, C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn price_history(
        &self,
        symbol: &str,
        lookback_days: u32,
        interval: BarInterval,
    ) -> Result<PriceSeries, DataError> {
        let key = CacheKey {
            symbol: symbol.to_string(),
            lookback_days,
            interval,
        };
        if let Some(series) = self.cache.get(&key) {
            debug!(symbol, "price cache hit");
            return Ok(series);
        }
        let series = self.inner.price_history(symbol, lookback_days, interval)?;
        self.cache.put(key, series.clone());
        Ok(series)
    }
}

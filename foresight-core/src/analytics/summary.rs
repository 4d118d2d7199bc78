//! Descriptive market summary: total move, average daily return,
//! volatility, and coarse trend / tone / risk classes.

use serde::Serialize;
use std::fmt;

use crate::domain::PriceSeries;
use crate::signals::{SentimentSummary, SENTIMENT_POLARITY_THRESHOLD};
use crate::stats::{mean, percentile, sample_std};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Upward,
    Downward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Bullish,
    Neutral,
    Bearish,
}

impl Tone {
    pub fn from_sentiment(score: f64) -> Self {
        if score > SENTIMENT_POLARITY_THRESHOLD {
            Tone::Bullish
        } else if score < -SENTIMENT_POLARITY_THRESHOLD {
            Tone::Bearish
        } else {
            Tone::Neutral
        }
    }
}

/// Bucketed by daily volatility in percent: below 1, below 2, otherwise high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_volatility_pct(volatility_pct: f64) -> Self {
        if volatility_pct < 1.0 {
            RiskLevel::Low
        } else if volatility_pct < 2.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }
}

macro_rules! display_snake {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self { $(Self::$variant => $text),+ })
            }
        }
    };
}

display_snake!(TrendDirection { Upward => "upward", Downward => "downward" });
display_snake!(Tone { Bullish => "bullish", Neutral => "neutral", Bearish => "bearish" });
display_snake!(RiskLevel { Low => "low", Moderate => "moderate", High => "high" });

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub first_close: f64,
    pub last_close: f64,
    /// Percent change from first to last close.
    pub total_change_pct: f64,
    pub avg_daily_return_pct: f64,
    /// Sample standard deviation of daily simple returns, percent.
    pub volatility_pct: f64,
    /// 5th and 95th percentile daily return, percent.
    pub worst_day_pct: f64,
    pub best_day_pct: f64,
    pub trend: TrendDirection,
    pub risk: RiskLevel,
    pub sentiment: SentimentSummary,
    pub tone: Tone,
}

impl MarketSummary {
    pub fn new(series: &PriceSeries, sentiment: SentimentSummary) -> Self {
        let closes = series.closes();
        let first_close = closes[0];
        let last_close = series.last_price();
        let total_change_pct = (last_close / first_close - 1.0) * 100.0;

        let returns_pct: Vec<f64> = series.simple_returns().iter().map(|r| r * 100.0).collect();
        let volatility_pct = sample_std(&returns_pct);
        let (worst_day_pct, best_day_pct) = if returns_pct.is_empty() {
            (0.0, 0.0)
        } else {
            (percentile(&returns_pct, 5.0), percentile(&returns_pct, 95.0))
        };

        Self {
            first_close,
            last_close,
            total_change_pct,
            avg_daily_return_pct: mean(&returns_pct),
            volatility_pct,
            worst_day_pct,
            best_day_pct,
            trend: if total_change_pct > 0.0 {
                TrendDirection::Upward
            } else {
                TrendDirection::Downward
            },
            risk: RiskLevel::from_volatility_pct(volatility_pct),
            tone: Tone::from_sentiment(sentiment.score),
            sentiment,
        }
    }
}

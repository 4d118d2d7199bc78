//! Technical indicators over a close series.
//!
//! Every indicator returns a vector the same length as its input, with
//! `f64::NAN` during warmup. No value at index t depends on closes after t.

use serde::Serialize;

use crate::domain::PriceSeries;
use crate::stats::{mean, sample_std};

/// Single-line indicator over closes.
pub trait Indicator: Send + Sync {
    /// e.g. "rsi_14".
    fn name(&self) -> &str;

    /// Leading values that are NaN.
    fn lookback(&self) -> usize;

    fn compute(&self, closes: &[f64]) -> Vec<f64>;
}

/// Relative Strength Index with Wilder smoothing.
///
/// RSI = 100 - 100 / (1 + avg_gain / avg_loss). No movement at all gives 50.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    /// Periods below 1 are raised to 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let n = closes.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period + 1 {
            return result;
        }

        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        for i in 1..=self.period {
            let ch = closes[i] - closes[i - 1];
            if ch > 0.0 {
                avg_gain += ch;
            } else {
                avg_loss -= ch;
            }
        }
        avg_gain /= self.period as f64;
        avg_loss /= self.period as f64;
        result[self.period] = rsi_value(avg_gain, avg_loss);

        let alpha = 1.0 / self.period as f64;
        for i in (self.period + 1)..n {
            let ch = closes[i] - closes[i - 1];
            avg_gain = alpha * ch.max(0.0) + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * (-ch).max(0.0) + (1.0 - alpha) * avg_loss;
            result[i] = rsi_value(avg_gain, avg_loss);
        }
        result
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Exponential moving average seeded with the first close, so it has no
/// warmup: `ema[0] = close[0]`, `ema[t] = a * close[t] + (1 - a) * ema[t-1]`
/// with `a = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let alpha = 2.0 / (self.period as f64 + 1.0);
        let mut out = Vec::with_capacity(closes.len());
        for (i, &c) in closes.iter().enumerate() {
            let v = if i == 0 {
                c
            } else {
                alpha * c + (1.0 - alpha) * out[i - 1]
            };
            out.push(v);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Rolling mean +/- `multiplier` rolling sample standard deviations.
/// The first `period - 1` values are NaN.
pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    let n = closes.len();
    let period = period.max(1);
    let mut bands = BollingerBands {
        upper: vec![f64::NAN; n],
        middle: vec![f64::NAN; n],
        lower: vec![f64::NAN; n],
    };
    if n < period {
        return bands;
    }
    for i in (period - 1)..n {
        let window = &closes[i + 1 - period..=i];
        let m = mean(window);
        let sd = sample_std(window);
        bands.middle[i] = m;
        bands.upper[i] = m + multiplier * sd;
        bands.lower[i] = m - multiplier * sd;
    }
    bands
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD line = EMA(fast) - EMA(slow); signal = EMA(signal) of the line.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = Ema::new(fast).compute(closes);
    let slow_ema = Ema::new(slow).compute(closes);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = Ema::new(signal).compute(&line);
    let histogram = line.iter().zip(&signal_line).map(|(l, s)| l - s).collect();
    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}

/// Latest value of each standard indicator: Bollinger(20, 2), RSI(14),
/// MACD(12, 26, 9). Fields are NaN when the series is too short.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TechnicalSnapshot {
    pub close: f64,
    pub bollinger_upper: f64,
    pub bollinger_middle: f64,
    pub bollinger_lower: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
}

impl TechnicalSnapshot {
    pub fn latest(series: &PriceSeries) -> Self {
        let closes = series.closes();
        let last = closes.len() - 1;
        let bands = bollinger(closes, 20, 2.0);
        let rsi = Rsi::default().compute(closes);
        let m = macd(closes, 12, 26, 9);
        Self {
            close: closes[last],
            bollinger_upper: bands.upper[last],
            bollinger_middle: bands.middle[last],
            bollinger_lower: bands.lower[last],
            rsi: rsi[last],
            macd: m.line[last],
            macd_signal: m.signal[last],
            macd_histogram: m.histogram[last],
        }
    }
}

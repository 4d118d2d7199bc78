//! Trend estimator: additive piecewise-linear trend + Fourier seasonality,
//! extrapolated over the forecast horizon.
//!
//! The model for a close on day `d` (days since the first observation) is
//!
//! ```text
//! y(d) = k + m·t + Σ_j δ_j·max(0, t − s_j) + Σ_s Σ_k (a_sk·sin(2πkd/P_s) + b_sk·cos(2πkd/P_s))
//! ```
//!
//! with `t = d / span` scaled to [0, 1] and `y` scaled by the largest close.
//! Changepoints `s_j` are spread over the first `changepoint_range` of the
//! history. Coefficients are fitted by penalised least squares: the
//! changepoint deltas carry a ridge penalty inversely proportional to the
//! squared flexibility scale, so a flexible trend bends freely at
//! changepoints and a stiff one stays close to a single line.
//!
//! Past the last changepoint the trend continues with its final slope; the
//! projection is deterministic.

use chrono::{Duration, NaiveDate};
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;
use tracing::debug;

use crate::config::TrendConfig;
use crate::domain::PriceSeries;
use crate::linalg::{ridge_solve, LinalgError};

/// Penalty unit for changepoint deltas, per observation, before dividing by
/// the squared prior scale.
const CHANGEPOINT_PENALTY_UNIT: f64 = 1e-4;
/// Prior scale for seasonal coefficients (loose).
const SEASONALITY_PRIOR_SCALE: f64 = 10.0;
/// Numerical jitter on the unpenalised intercept and slope.
const BASE_JITTER: f64 = 1e-9;

/// How readily the trend may bend at changepoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flexibility {
    Low,
    Medium,
    High,
}

impl Flexibility {
    /// Three-tier mapping from market beta: > 1.2 high, < 0.8 low, otherwise
    /// medium. Missing or NaN beta is medium.
    pub fn from_beta(beta: Option<f64>) -> Self {
        match beta {
            Some(b) if b > 1.2 => Flexibility::High,
            Some(b) if b < 0.8 => Flexibility::Low,
            _ => Flexibility::Medium,
        }
    }

    /// Changepoint prior scale for this tier.
    pub fn changepoint_prior_scale(&self) -> f64 {
        match self {
            Flexibility::Low => 0.01,
            Flexibility::Medium => 0.05,
            Flexibility::High => 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrendError {
    #[error("trend fit needs at least 2 points, got {0}")]
    TooShort(usize),

    #[error("trend fit failed: {0}")]
    Solve(#[from] LinalgError),
}

/// A Fourier seasonality term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Seasonality {
    pub name: &'static str,
    pub period_days: f64,
    pub order: usize,
}

impl Seasonality {
    fn features(&self, day: f64) -> impl Iterator<Item = f64> + '_ {
        (1..=self.order).flat_map(move |k| {
            let x = 2.0 * PI * k as f64 * day / self.period_days;
            [x.sin(), x.cos()]
        })
    }

    fn width(&self) -> usize {
        2 * self.order
    }
}

/// Per-day fractional drift implied by the trend projection.
///
/// `drifts[0]` is always 0; `drifts[i]` is the percentage change of the
/// projected price from day `i - 1` to day `i`. Length equals the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendProjection {
    drifts: Vec<f64>,
}

impl TrendProjection {
    pub fn new(drifts: Vec<f64>) -> Self {
        Self { drifts }
    }

    /// A zero-drift projection of length `horizon`.
    pub fn flat(horizon: usize) -> Self {
        Self {
            drifts: vec![0.0; horizon],
        }
    }

    /// Day-over-day percentage change of `path`, first value 0.
    pub fn from_path(path: &[f64]) -> Self {
        let mut drifts = Vec::with_capacity(path.len());
        for (i, &price) in path.iter().enumerate() {
            if i == 0 {
                drifts.push(0.0);
                continue;
            }
            let prev = path[i - 1];
            let drift = if prev > 0.0 && price.is_finite() {
                price / prev - 1.0
            } else {
                0.0
            };
            drifts.push(drift);
        }
        Self { drifts }
    }

    pub fn drifts(&self) -> &[f64] {
        &self.drifts
    }

    pub fn horizon(&self) -> usize {
        self.drifts.len()
    }
}

/// Fitted trend + seasonality coefficients.
#[derive(Debug, Clone)]
pub struct TrendFit {
    start: NaiveDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    coefficients: Array1<f64>,
    flexibility: Flexibility,
}

impl TrendFit {
    pub fn flexibility(&self) -> Flexibility {
        self.flexibility
    }

    pub fn changepoint_count(&self) -> usize {
        self.changepoints.len()
    }

    pub fn seasonalities(&self) -> &[Seasonality] {
        &self.seasonalities
    }

    /// Model value for a calendar date (may lie beyond the fitted history).
    pub fn predict(&self, date: NaiveDate) -> f64 {
        let day = (date - self.start).num_days() as f64;
        let row = design_row(
            day,
            self.span_days,
            &self.changepoints,
            &self.seasonalities,
        );
        row.dot(&self.coefficients) * self.y_scale
    }

    /// Slope of the trend component after the last changepoint, in price per day.
    pub fn terminal_slope_per_day(&self) -> f64 {
        let deltas = self
            .coefficients
            .slice(s![2..2 + self.changepoints.len()])
            .sum();
        (self.coefficients[1] + deltas) * self.y_scale / self.span_days
    }
}

/// Deterministic trend projection for a horizon.
#[derive(Debug, Clone)]
pub struct TrendForecast {
    pub dates: Vec<NaiveDate>,
    /// Projected prices, one per future calendar day.
    pub prices: Vec<f64>,
    pub projection: TrendProjection,
}

/// Fits [`TrendFit`] and extrapolates it.
#[derive(Debug, Clone)]
pub struct TrendEstimator {
    flexibility: Flexibility,
    n_changepoints: usize,
    changepoint_range: f64,
    weekly_order: usize,
    yearly_order: usize,
}

impl TrendEstimator {
    pub fn new(flexibility: Flexibility, config: &TrendConfig) -> Self {
        Self {
            flexibility,
            n_changepoints: config.n_changepoints,
            changepoint_range: config.changepoint_range,
            weekly_order: config.weekly_order,
            yearly_order: config.yearly_order,
        }
    }

    /// Estimator whose flexibility tier follows the instrument's beta.
    pub fn for_beta(beta: Option<f64>, config: &TrendConfig) -> Self {
        Self::new(Flexibility::from_beta(beta), config)
    }

    pub fn flexibility(&self) -> Flexibility {
        self.flexibility
    }

    pub fn fit(&self, series: &PriceSeries) -> Result<TrendFit, TrendError> {
        let n = series.len();
        if n < 2 {
            return Err(TrendError::TooShort(n));
        }

        let start = series.first_date();
        let span_days = series.span_days().max(1) as f64;
        let closes = series.closes();
        let y_scale = closes.iter().fold(0.0_f64, |acc, &p| acc.max(p.abs()));
        let y: Array1<f64> = closes.iter().map(|p| p / y_scale).collect();
        let days: Vec<f64> = series
            .dates()
            .iter()
            .map(|d| (*d - start).num_days() as f64)
            .collect();

        let seasonalities = self.seasonalities_for(span_days, n);

        // Flat history: the exact fit is the intercept alone.
        if y.iter().all(|&v| v == y[0]) {
            let width = 2 + seasonalities.iter().map(Seasonality::width).sum::<usize>();
            let mut coefficients = Array1::zeros(width);
            coefficients[0] = y[0];
            return Ok(TrendFit {
                start,
                span_days,
                y_scale,
                changepoints: Vec::new(),
                seasonalities,
                coefficients,
                flexibility: self.flexibility,
            });
        }

        let changepoints = self.changepoints_for(&days, span_days);

        let seasonal_width: usize = seasonalities.iter().map(Seasonality::width).sum();
        let mut design = Array2::<f64>::zeros((n, 2 + changepoints.len() + seasonal_width));
        for (i, &d) in days.iter().enumerate() {
            design
                .row_mut(i)
                .assign(&design_row(d, span_days, &changepoints, &seasonalities));
        }

        let tau = self.flexibility.changepoint_prior_scale();
        let cp_penalty = n as f64 * CHANGEPOINT_PENALTY_UNIT / (tau * tau);
        let seasonal_penalty =
            n as f64 * CHANGEPOINT_PENALTY_UNIT / (SEASONALITY_PRIOR_SCALE * SEASONALITY_PRIOR_SCALE);

        let mut penalty = vec![BASE_JITTER, BASE_JITTER];
        penalty.extend(std::iter::repeat(cp_penalty).take(changepoints.len()));
        penalty.extend(std::iter::repeat(seasonal_penalty).take(seasonal_width));

        let coefficients = ridge_solve(&design, &y, &penalty)?;

        debug!(
            points = n,
            changepoints = changepoints.len(),
            seasonal_terms = seasonal_width,
            flexibility = ?self.flexibility,
            "trend fitted"
        );

        Ok(TrendFit {
            start,
            span_days,
            y_scale,
            changepoints,
            seasonalities,
            coefficients,
            flexibility: self.flexibility,
        })
    }

    /// Fit and extrapolate `horizon` calendar days past the last observation.
    pub fn project(&self, series: &PriceSeries, horizon: usize) -> Result<TrendForecast, TrendError> {
        let fit = self.fit(series)?;
        let last = series.last_date();
        let dates: Vec<NaiveDate> = (1..=horizon as i64)
            .map(|k| last + Duration::days(k))
            .collect();
        let prices: Vec<f64> = dates.iter().map(|&d| fit.predict(d)).collect();
        let projection = TrendProjection::from_path(&prices);
        Ok(TrendForecast {
            dates,
            prices,
            projection,
        })
    }

    fn seasonalities_for(&self, span_days: f64, n: usize) -> Vec<Seasonality> {
        let mut out = Vec::new();
        let mean_spacing = span_days / (n - 1).max(1) as f64;
        if self.weekly_order > 0 && span_days >= 14.0 && mean_spacing < 7.0 {
            out.push(Seasonality {
                name: "weekly",
                period_days: 7.0,
                order: self.weekly_order,
            });
        }
        if self.yearly_order > 0 && span_days >= 730.0 {
            out.push(Seasonality {
                name: "yearly",
                period_days: 365.25,
                order: self.yearly_order,
            });
        }
        out
    }

    /// Changepoints at evenly spaced observations within the first
    /// `changepoint_range` of the history, in scaled time.
    fn changepoints_for(&self, days: &[f64], span_days: f64) -> Vec<f64> {
        let hist_size = (days.len() as f64 * self.changepoint_range).floor() as usize;
        if hist_size < 2 {
            return Vec::new();
        }
        let count = self.n_changepoints.min(hist_size - 1);
        if count == 0 {
            return Vec::new();
        }
        let step = (hist_size - 1) as f64 / count as f64;
        (1..=count)
            .map(|i| {
                let idx = (i as f64 * step).round() as usize;
                days[idx.min(days.len() - 1)] / span_days
            })
            .collect()
    }
}

fn design_row(
    day: f64,
    span_days: f64,
    changepoints: &[f64],
    seasonalities: &[Seasonality],
) -> Array1<f64> {
    let t = day / span_days;
    [1.0, t]
        .into_iter()
        .chain(changepoints.iter().map(|&cp| (t - cp).max(0.0)))
        .chain(seasonalities.iter().flat_map(|season| season.features(day)))
        .collect()
}

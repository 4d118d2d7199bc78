//! PriceSeries: the validated daily close history every component reads.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single (date, close) observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Input errors: the series cannot be forecast and no component is run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("price series is empty")]
    Empty,

    #[error("price series too short: {len} points, need at least {required}")]
    TooShort { len: usize, required: usize },

    #[error("dates not strictly increasing at index {index}: {date} follows {previous}")]
    NonMonotonicDate {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("invalid close at index {index} ({date}): {price}")]
    InvalidPrice {
        index: usize,
        date: NaiveDate,
        price: f64,
    },
}

/// Ordered daily closes, strictly increasing by date, every price finite and > 0.
///
/// Immutable after construction. Dates and closes are stored column-wise so
/// estimators can borrow `closes()` as a plain slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
}

impl PriceSeries {
    /// Validate and build a series from points already in date order.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        if points.is_empty() {
            return Err(SeriesError::Empty);
        }

        let mut dates = Vec::with_capacity(points.len());
        let mut closes = Vec::with_capacity(points.len());

        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(SeriesError::InvalidPrice {
                    index,
                    date: point.date,
                    price: point.close,
                });
            }
            if let Some(&previous) = dates.last() {
                if point.date <= previous {
                    return Err(SeriesError::NonMonotonicDate {
                        index,
                        previous,
                        date: point.date,
                    });
                }
            }
            dates.push(point.date);
            closes.push(point.close);
        }

        Ok(Self { dates, closes })
    }

    /// Build a series of consecutive calendar days starting at `start`.
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Result<Self, SeriesError> {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint::new(start + Duration::days(i as i64), close))
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    /// Always false for a constructed series; kept for slice-like ergonomics.
    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn points(&self) -> impl Iterator<Item = PricePoint> + '_ {
        self.dates
            .iter()
            .zip(&self.closes)
            .map(|(&date, &close)| PricePoint { date, close })
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn last_price(&self) -> f64 {
        self.closes[self.closes.len() - 1]
    }

    /// The trailing `n` closes (or all of them if the series is shorter).
    pub fn trailing_closes(&self, n: usize) -> &[f64] {
        let start = self.closes.len().saturating_sub(n);
        &self.closes[start..]
    }

    /// Calendar days between the first and last observation.
    pub fn span_days(&self) -> i64 {
        (self.last_date() - self.first_date()).num_days()
    }

    /// Reject series shorter than `required` points.
    pub fn require_len(&self, required: usize) -> Result<(), SeriesError> {
        if self.len() < required {
            return Err(SeriesError::TooShort {
                len: self.len(),
                required,
            });
        }
        Ok(())
    }

    /// Day-over-day simple returns.
    pub fn simple_returns(&self) -> Vec<f64> {
        self.closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn builds_valid_series() {
        let series = PriceSeries::new(vec![
            PricePoint::new(day(2), 100.0),
            PricePoint::new(day(3), 101.0),
            PricePoint::new(day(5), 99.5),
        ])
        .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.last_price(), 99.5);
        assert_eq!(series.last_date(), day(5));
        assert_eq!(series.span_days(), 3);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(PriceSeries::new(vec![]), Err(SeriesError::Empty));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = PriceSeries::new(vec![
            PricePoint::new(day(2), 100.0),
            PricePoint::new(day(2), 101.0),
        ])
        .unwrap_err();
        assert!(matches!(err, SeriesError::NonMonotonicDate { index: 1, .. }));
    }

    #[test]
    fn rejects_out_of_order_dates() {
        let err = PriceSeries::new(vec![
            PricePoint::new(day(3), 100.0),
            PricePoint::new(day(2), 101.0),
        ])
        .unwrap_err();
        assert!(matches!(err, SeriesError::NonMonotonicDate { .. }));
    }

    #[test]
    fn rejects_non_positive_and_nan_prices() {
        let zero = PriceSeries::new(vec![PricePoint::new(day(2), 0.0)]).unwrap_err();
        assert!(matches!(zero, SeriesError::InvalidPrice { index: 0, .. }));

        let nan = PriceSeries::new(vec![
            PricePoint::new(day(2), 10.0),
            PricePoint::new(day(3), f64::NAN),
        ])
        .unwrap_err();
        assert!(matches!(nan, SeriesError::InvalidPrice { index: 1, .. }));
    }

    #[test]
    fn from_closes_uses_consecutive_days() {
        let series = PriceSeries::from_closes(day(1), &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(series.dates()[2], day(3));
        assert_eq!(series.trailing_closes(2), &[2.0, 3.0]);
        assert_eq!(series.trailing_closes(10).len(), 3);
    }

    #[test]
    fn require_len_reports_shortfall() {
        let series = PriceSeries::from_closes(day(1), &[1.0, 2.0]).unwrap();
        assert!(series.require_len(2).is_ok());
        assert_eq!(
            series.require_len(5),
            Err(SeriesError::TooShort { len: 2, required: 5 })
        );
    }

    #[test]
    fn simple_returns_are_day_over_day() {
        let series = PriceSeries::from_closes(day(1), &[100.0, 110.0, 99.0]).unwrap();
        let r = series.simple_returns();
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.10).abs() < 1e-12);
        assert!((r[1] + 0.10).abs() < 1e-12);
    }
}

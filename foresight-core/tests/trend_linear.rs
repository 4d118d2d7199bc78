//! Trend extrapolation on a noiseless linear history.
//!
//! Three years of daily closes with a constant slope: every flexibility tier
//! must continue the line, with weekly and yearly seasonal terms present
//! but contributing nothing.

use chrono::{Duration, NaiveDate};

use foresight_core::config::TrendConfig;
use foresight_core::domain::PriceSeries;
use foresight_core::trend::{Flexibility, TrendEstimator};

const DAYS: usize = 3 * 365 + 1;
const SLOPE: f64 = 0.05;
const INTERCEPT: f64 = 40.0;

fn linear_series() -> PriceSeries {
    let closes: Vec<f64> = (0..DAYS).map(|i| INTERCEPT + SLOPE * i as f64).collect();
    PriceSeries::from_closes(NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(), &closes).unwrap()
}

fn expected(day_after_last: usize) -> f64 {
    INTERCEPT + SLOPE * (DAYS - 1 + day_after_last) as f64
}

#[test]
fn every_tier_continues_the_line() {
    let series = linear_series();
    for flexibility in [Flexibility::Low, Flexibility::Medium, Flexibility::High] {
        let forecast = TrendEstimator::new(flexibility, &TrendConfig::default())
            .project(&series, 60)
            .unwrap();
        for (k, &p) in forecast.prices.iter().enumerate() {
            let want = expected(k + 1);
            assert!(
                ((p - want) / want).abs() < 5e-3,
                "{flexibility:?} day {}: projected {p}, expected {want}",
                k + 1
            );
        }
    }
}

#[test]
fn both_seasonal_terms_are_fitted_on_three_years() {
    let fit = TrendEstimator::new(Flexibility::Medium, &TrendConfig::default())
        .fit(&linear_series())
        .unwrap();
    let names: Vec<&str> = fit.seasonalities().iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["weekly", "yearly"]);
    assert!(fit.changepoint_count() > 0);
    assert!((fit.terminal_slope_per_day() - SLOPE).abs() < 1e-3);
}

#[test]
fn projection_dates_and_drifts_line_up() {
    let series = linear_series();
    let forecast = TrendEstimator::new(Flexibility::Medium, &TrendConfig::default())
        .project(&series, 30)
        .unwrap();

    assert_eq!(forecast.dates.len(), 30);
    assert_eq!(forecast.dates[0], series.last_date() + Duration::days(1));
    assert_eq!(forecast.projection.horizon(), 30);

    let drifts = forecast.projection.drifts();
    assert_eq!(drifts[0], 0.0);
    for (i, &d) in drifts.iter().enumerate().skip(1) {
        let want = SLOPE / expected(i);
        assert!(d > 0.0, "drift {i} not rising: {d}");
        assert!((d - want).abs() < 2.5e-4, "drift {i}: {d} vs {want}");
    }
}

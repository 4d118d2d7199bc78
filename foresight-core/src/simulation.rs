//! Monte Carlo price paths around a trend projection.
//!
//! Each path starts at the last observed price and compounds
//! `P_t = P_{t-1} * (1 + drift_t + shock_t)` with `shock_t ~ N(0, sigma)`.
//! Paths draw from their own RNG stream `("mc_path", index)` of the
//! [`SeedHierarchy`], so the bundle is identical for a given seed no matter
//! how rayon schedules the work.

use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::rng::SeedHierarchy;
use crate::stats::percentile_sorted;
use crate::trend::TrendProjection;
use crate::volatility::VolatilityEstimate;

/// Smallest per-day growth factor a path may take. Keeps prices > 0 when a
/// shock would otherwise push `1 + drift + shock` to or below zero.
const MIN_GROWTH: f64 = 1e-6;

/// 5th / 50th / 95th percentile lines across paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileBands {
    pub p5: Vec<f64>,
    pub p50: Vec<f64>,
    pub p95: Vec<f64>,
}

/// `horizon x path_count` simulated prices, stored day-major.
///
/// Percentile bands are derived on request and never cached alongside the
/// raw matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationBundle {
    start_price: f64,
    horizon: usize,
    path_count: usize,
    seed: u64,
    /// `values[t * path_count + p]` is path `p` on day `t + 1`.
    values: Vec<f64>,
}

impl SimulationBundle {
    pub fn start_price(&self) -> f64 {
        self.start_price
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn path_count(&self) -> usize {
        self.path_count
    }

    /// Master seed the bundle was generated with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// All path values on day `t` (0-based, i.e. `t = 0` is the first
    /// simulated day).
    pub fn day(&self, t: usize) -> &[f64] {
        let start = t * self.path_count;
        &self.values[start..start + self.path_count]
    }

    /// One complete path across the horizon.
    pub fn path(&self, p: usize) -> Vec<f64> {
        (0..self.horizon)
            .map(|t| self.values[t * self.path_count + p])
            .collect()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Per-day percentile `p` (0..=100) across paths.
    pub fn percentile_band(&self, p: f64) -> Vec<f64> {
        (0..self.horizon)
            .map(|t| {
                let mut day = self.day(t).to_vec();
                day.sort_by(|a, b| a.total_cmp(b));
                percentile_sorted(&day, p)
            })
            .collect()
    }

    pub fn median(&self) -> Vec<f64> {
        self.percentile_band(50.0)
    }

    pub fn bands(&self) -> PercentileBands {
        let mut p5 = Vec::with_capacity(self.horizon);
        let mut p50 = Vec::with_capacity(self.horizon);
        let mut p95 = Vec::with_capacity(self.horizon);
        for t in 0..self.horizon {
            let mut day = self.day(t).to_vec();
            day.sort_by(|a, b| a.total_cmp(b));
            p5.push(percentile_sorted(&day, 5.0));
            p50.push(percentile_sorted(&day, 50.0));
            p95.push(percentile_sorted(&day, 95.0));
        }
        PercentileBands { p5, p50, p95 }
    }
}

/// Generates [`SimulationBundle`]s.
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    path_count: usize,
    seeds: SeedHierarchy,
}

impl MonteCarloSimulator {
    /// `seed = None` draws a fresh master seed.
    pub fn new(path_count: usize, seed: Option<u64>) -> Self {
        Self {
            path_count,
            seeds: SeedHierarchy::from_optional(seed),
        }
    }

    pub fn path_count(&self) -> usize {
        self.path_count
    }

    pub fn seed(&self) -> u64 {
        self.seeds.master_seed()
    }

    /// Simulate `path_count` paths over the projection's horizon.
    pub fn simulate(
        &self,
        start_price: f64,
        projection: &TrendProjection,
        volatility: &VolatilityEstimate,
    ) -> SimulationBundle {
        let horizon = projection.horizon();
        let sigma = volatility.sigma;
        let drifts = projection.drifts();

        debug!(
            start_price,
            sigma,
            horizon,
            paths = self.path_count,
            seed = self.seeds.master_seed(),
            "simulating price paths"
        );

        let paths: Vec<Vec<f64>> = (0..self.path_count)
            .into_par_iter()
            .map(|p| {
                let mut rng = self.seeds.rng_for("mc_path", p as u64);
                let mut price = start_price;
                drifts
                    .iter()
                    .map(|&drift| {
                        let z: f64 = StandardNormal.sample(&mut rng);
                        let growth = (1.0 + drift + sigma * z).max(MIN_GROWTH);
                        price *= growth;
                        price
                    })
                    .collect()
            })
            .collect();

        let mut values = vec![0.0; horizon * self.path_count];
        for (p, path) in paths.iter().enumerate() {
            for (t, &v) in path.iter().enumerate() {
                values[t * self.path_count + p] = v;
            }
        }

        SimulationBundle {
            start_price,
            horizon,
            path_count: self.path_count,
            seed: self.seeds.master_seed(),
            values,
        }
    }
}

/// Linear sentiment overlay on the median: `adj_t = P0 * s * k * t / H`.
#[derive(Debug, Clone, Copy)]
pub struct SentimentAdjustment {
    drift_scale: f64,
}

impl Default for SentimentAdjustment {
    fn default() -> Self {
        Self { drift_scale: 0.1 }
    }
}

/// The two median lines a forecast reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionLines {
    pub median: Vec<f64>,
    pub sentiment_adjusted: Vec<f64>,
}

impl ProjectionLines {
    /// Last value of the sentiment-adjusted median, if the horizon is non-empty.
    pub fn adjusted_end(&self) -> Option<f64> {
        self.sentiment_adjusted.last().copied()
    }
}

impl SentimentAdjustment {
    pub fn new(drift_scale: f64) -> Self {
        Self { drift_scale }
    }

    /// Sentiment is clamped into [-1, 1]; NaN counts as 0. Only the median
    /// moves; the band is left to the bundle.
    pub fn apply(&self, start_price: f64, median: &[f64], sentiment: f64) -> ProjectionLines {
        let s = if sentiment.is_nan() {
            0.0
        } else {
            sentiment.clamp(-1.0, 1.0)
        };
        let horizon = median.len() as f64;
        let sentiment_adjusted = median
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                let t = (i + 1) as f64;
                m + start_price * s * self.drift_scale * (t / horizon)
            })
            .collect();
        ProjectionLines {
            median: median.to_vec(),
            sentiment_adjusted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "expected {b}, got {a}");
    }

    #[test]
    fn zero_sigma_paths_equal_trend_path() {
        let projection = TrendProjection::new(vec![0.0, 0.01, 0.01, -0.02]);
        let sim = MonteCarloSimulator::new(50, Some(42));
        let bundle = sim.simulate(100.0, &projection, &VolatilityEstimate::measured(0.0, 10));

        let expected = [100.0, 101.0, 102.01, 102.01 * 0.98];
        for p in 0..bundle.path_count() {
            let path = bundle.path(p);
            for (got, want) in path.iter().zip(expected) {
                assert_approx(*got, want, 1e-9);
            }
        }
    }

    #[test]
    fn flat_projection_zero_sigma_repeats_start_price() {
        let sim = MonteCarloSimulator::new(20, Some(1));
        let bundle = sim.simulate(
            42.0,
            &TrendProjection::flat(15),
            &VolatilityEstimate::insufficient(),
        );
        assert!(bundle.values().iter().all(|&v| v == 42.0));
        assert_eq!(bundle.values().len(), 15 * 20);
    }

    #[test]
    fn same_seed_same_bundle() {
        let projection = TrendProjection::flat(30);
        let vol = VolatilityEstimate::measured(0.02, 100);
        let a = MonteCarloSimulator::new(64, Some(7)).simulate(50.0, &projection, &vol);
        let b = MonteCarloSimulator::new(64, Some(7)).simulate(50.0, &projection, &vol);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let projection = TrendProjection::flat(10);
        let vol = VolatilityEstimate::measured(0.02, 100);
        let a = MonteCarloSimulator::new(8, Some(1)).simulate(50.0, &projection, &vol);
        let b = MonteCarloSimulator::new(8, Some(2)).simulate(50.0, &projection, &vol);
        assert_ne!(a.values(), b.values());
    }

    #[test]
    fn extreme_volatility_stays_positive() {
        let sim = MonteCarloSimulator::new(200, Some(3));
        let bundle = sim.simulate(
            10.0,
            &TrendProjection::flat(60),
            &VolatilityEstimate::measured(3.0, 100),
        );
        assert!(bundle.values().iter().all(|&v| v > 0.0 && v.is_finite()));
    }

    #[test]
    fn bands_are_ordered() {
        let sim = MonteCarloSimulator::new(100, Some(11));
        let bundle = sim.simulate(
            100.0,
            &TrendProjection::flat(20),
            &VolatilityEstimate::measured(0.03, 100),
        );
        let bands = bundle.bands();
        assert_eq!(bands.p50, bundle.median());
        for t in 0..20 {
            assert!(bands.p5[t] <= bands.p50[t]);
            assert!(bands.p50[t] <= bands.p95[t]);
        }
    }

    #[test]
    fn sentiment_moves_only_the_median_linearly() {
        let median = vec![100.0; 10];
        let lines = SentimentAdjustment::new(0.1).apply(100.0, &median, 1.0);
        assert_eq!(lines.median, median);
        assert_approx(lines.sentiment_adjusted[0], 101.0, 1e-12);
        assert_approx(lines.sentiment_adjusted[4], 105.0, 1e-12);
        assert_approx(lines.adjusted_end().unwrap(), 110.0, 1e-12);
    }

    #[test]
    fn sentiment_is_clamped_and_nan_neutral() {
        let median = vec![100.0; 4];
        let clamped = SentimentAdjustment::default().apply(100.0, &median, -5.0);
        assert_approx(clamped.adjusted_end().unwrap(), 90.0, 1e-12);

        let nan = SentimentAdjustment::default().apply(100.0, &median, f64::NAN);
        assert_eq!(nan.sentiment_adjusted, median);
    }

    #[test]
    fn zero_horizon_is_empty() {
        let bundle = MonteCarloSimulator::new(5, Some(0)).simulate(
            10.0,
            &TrendProjection::flat(0),
            &VolatilityEstimate::measured(0.1, 3),
        );
        assert_eq!(bundle.horizon(), 0);
        assert!(bundle.median().is_empty());
    }
}

//! Property tests for scoring and simulation invariants.
//!
//! Uses proptest to verify:
//! 1. Normalizer bounds and monotonicity
//! 2. Composite score bounds and label/score consistency
//! 3. Monte Carlo positivity and reproducibility
//! 4. Fundamental composite ignores missing ratios

use chrono::NaiveDate;
use proptest::prelude::*;

use foresight_core::domain::{Action, PriceSeries, Signal, SignalSource};
use foresight_core::scorer::CompositeScorer;
use foresight_core::signals::{fundamental_signal, normalize, FundamentalRatios};
use foresight_core::simulation::MonteCarloSimulator;
use foresight_core::trend::TrendProjection;
use foresight_core::volatility::{VolatilityEstimate, VolatilityEstimator};

// ── Strategies ───────────────────────────────────────────────────────

fn arb_domain() -> impl Strategy<Value = (f64, f64)> {
    (-1000.0..1000.0_f64, 0.001..500.0_f64).prop_map(|(low, width)| (low, low + width))
}

fn arb_signal() -> impl Strategy<Value = f64> {
    -1.0..=1.0_f64
}

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..500.0_f64, 2..80)
}

// ── 1. Normalizer ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn normalize_is_bounded(raw in -1e6..1e6_f64, (low, high) in arb_domain()) {
        let v = normalize(raw, low, high);
        prop_assert!((-1.0..=1.0).contains(&v));
    }

    #[test]
    fn normalize_is_monotonic(
        a in -2000.0..2000.0_f64,
        b in -2000.0..2000.0_f64,
        (low, high) in arb_domain(),
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(normalize(lo, low, high) <= normalize(hi, low, high));
    }

    #[test]
    fn normalize_maps_endpoints((low, high) in arb_domain()) {
        prop_assert!((normalize(low, low, high) + 1.0).abs() < 1e-9);
        prop_assert!((normalize(high, low, high) - 1.0).abs() < 1e-9);
    }
}

// ── 2. Composite score ───────────────────────────────────────────────

proptest! {
    #[test]
    fn composite_is_bounded_and_labelled_consistently(
        f in arb_signal(),
        fu in arb_signal(),
        s in arb_signal(),
    ) {
        let rec = CompositeScorer::default().score(
            Signal::new(SignalSource::Forecast, f),
            Signal::new(SignalSource::Fundamental, fu),
            Signal::new(SignalSource::Sentiment, s),
        );
        let c = rec.composite();
        prop_assert!((-1.0..=1.0).contains(&c));
        prop_assert_eq!(rec.action(), Action::from_composite(c));
        prop_assert!((rec.confidence() - c.abs()).abs() < 1e-12);
    }

    #[test]
    fn raising_one_signal_never_lowers_the_composite(
        f in arb_signal(),
        fu in arb_signal(),
        s in arb_signal(),
        bump in 0.0..1.0_f64,
    ) {
        let scorer = CompositeScorer::default();
        let score = |f: f64| {
            scorer
                .score(
                    Signal::new(SignalSource::Forecast, f),
                    Signal::new(SignalSource::Fundamental, fu),
                    Signal::new(SignalSource::Sentiment, s),
                )
                .composite()
        };
        prop_assert!(score((f + bump).min(1.0)) >= score(f) - 1e-12);
    }
}

// ── 3. Monte Carlo ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn simulated_prices_stay_positive(
        closes in arb_closes(),
        horizon in 1usize..40,
        drift in -0.5..0.5_f64,
        seed in any::<u64>(),
    ) {
        let series = PriceSeries::from_closes(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &closes,
        ).unwrap();
        let vol = VolatilityEstimator::default().estimate(&series);
        let mut drifts = vec![drift; horizon];
        drifts[0] = 0.0;
        let bundle = MonteCarloSimulator::new(16, Some(seed)).simulate(
            series.last_price(),
            &TrendProjection::new(drifts),
            &vol,
        );
        prop_assert_eq!(bundle.values().len(), 16 * horizon);
        prop_assert!(bundle.values().iter().all(|&v| v > 0.0 && v.is_finite()));
    }

    #[test]
    fn fixed_seed_reproduces_the_bundle(
        sigma in 0.0..0.1_f64,
        seed in any::<u64>(),
    ) {
        let projection = TrendProjection::flat(12);
        let vol = VolatilityEstimate::measured(sigma, 100);
        let a = MonteCarloSimulator::new(20, Some(seed)).simulate(50.0, &projection, &vol);
        let b = MonteCarloSimulator::new(20, Some(seed)).simulate(50.0, &projection, &vol);
        prop_assert_eq!(a.values(), b.values());
    }
}

// ── 4. Fundamentals ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn missing_ratios_do_not_dilute_the_composite(
        roe in -50.0..80.0_f64,
        margin in -50.0..80.0_f64,
    ) {
        let two = FundamentalRatios {
            roe: Some(roe),
            profit_margin: Some(margin),
            ..FundamentalRatios::default()
        };
        let expected = (normalize(roe, 0.0, 25.0) + normalize(margin, 0.0, 30.0)) / 2.0;
        prop_assert!((fundamental_signal(&two).value - expected).abs() < 1e-12);
    }
}

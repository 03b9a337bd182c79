//! Property tests for the breakout detector and score engine.
//!
//! Uses proptest to verify:
//! 1. Side consistency: LONG only above the base high, SHORT only below the base low
//! 2. Volume gate: each mode rejects volume below its multiplier of the base average
//! 3. Score bounds: every score lands in [0, 100], degenerate inputs included
//! 4. Pipeline determinism: same inputs, same candidate

use breakscan_core::components::{
    Base, BreakoutDetector, Rejection, ScoreEngine, TimingPolicy, BASE_LEN,
};
use breakscan_core::domain::{Bar, BarSeries, Interval, MarketRegime, Mode, Side, TrendDirection};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_bar_shape() -> impl Strategy<Value = (f64, f64, u64)> {
    // (mid price, half range, volume)
    (10.0..200.0_f64, 0.01..5.0_f64, 0..50_000_u64)
}

fn arb_series() -> impl Strategy<Value = BarSeries> {
    (
        prop::collection::vec(arb_bar_shape(), 29..40),
        1.0..250.0_f64,
        0..120_000_u64,
    )
        .prop_map(|(shapes, last_close, last_volume)| {
            let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
            let mut bars: Vec<Bar> = shapes
                .iter()
                .enumerate()
                .map(|(i, &(mid, half, volume))| Bar {
                    timestamp: start + Duration::minutes(15 * i as i64),
                    open: mid,
                    high: mid + half,
                    low: mid - half,
                    close: mid,
                    volume,
                })
                .collect();
            bars.push(Bar {
                timestamp: start + Duration::minutes(15 * shapes.len() as i64),
                open: last_close,
                high: last_close + 0.1,
                low: last_close - 0.1,
                close: last_close,
                volume: last_volume,
            });
            BarSeries::new("PROP", Interval::FifteenMinute, bars).unwrap()
        })
}

fn arb_regime() -> impl Strategy<Value = MarketRegime> {
    prop_oneof![
        Just(MarketRegime::Bull),
        Just(MarketRegime::Bear),
        Just(MarketRegime::Mixed),
        Just(MarketRegime::Neutral),
    ]
}

fn arb_trend() -> impl Strategy<Value = Option<TrendDirection>> {
    prop_oneof![
        Just(Some(TrendDirection::Up)),
        Just(Some(TrendDirection::Down)),
        Just(None),
    ]
}

fn arb_mode() -> impl Strategy<Value = Mode> {
    prop_oneof![Just(Mode::Safe), Just(Mode::Aggressive)]
}

// ── 1. Side Consistency ──────────────────────────────────────────────

proptest! {
    /// A detected side always agrees with where the close sits relative to the base.
    #[test]
    fn side_matches_base_break(
        series in arb_series(),
        regime in arb_regime(),
        trend in arb_trend(),
        mode in arb_mode(),
    ) {
        let base = Base::measure(&series, BASE_LEN).unwrap();
        let close = series.latest().unwrap().close;

        if let Ok(b) = BreakoutDetector::new(mode).detect(&series, regime, trend) {
            match b.side {
                Side::Long => {
                    prop_assert!(close > base.high);
                    prop_assert_eq!(b.level, base.high);
                    prop_assert_eq!(trend, Some(TrendDirection::Up));
                }
                Side::Short => {
                    prop_assert!(close < base.low);
                    prop_assert_eq!(b.level, base.low);
                    prop_assert_eq!(trend, Some(TrendDirection::Down));
                }
            }
            prop_assert!(!mode.vetoes(regime, b.side));
        }
    }

    /// A close inside the base never yields a candidate.
    #[test]
    fn inside_base_never_fires(series in arb_series(), regime in arb_regime(), mode in arb_mode()) {
        let base = Base::measure(&series, BASE_LEN).unwrap();
        let close = series.latest().unwrap().close;

        if close <= base.high && close >= base.low {
            for trend in [Some(TrendDirection::Up), Some(TrendDirection::Down), None] {
                prop_assert!(BreakoutDetector::new(mode).detect(&series, regime, trend).is_err());
            }
        }
    }
}

// ── 2. Volume Gate ───────────────────────────────────────────────────

proptest! {
    /// Below the mode's volume multiple the detector never emits.
    #[test]
    fn thin_volume_is_rejected(
        series in arb_series(),
        regime in arb_regime(),
        trend in arb_trend(),
        mode in arb_mode(),
    ) {
        let base = Base::measure(&series, BASE_LEN).unwrap();
        let thin = base.last_volume < base.avg_volume * mode.volume_multiplier();
        let above_floor = series.latest().unwrap().close >= 5.0;

        let result = BreakoutDetector::new(mode).detect(&series, regime, trend);
        if thin && above_floor {
            prop_assert_eq!(result, Err(Rejection::ThinVolume));
        } else if !thin {
            prop_assert_ne!(result, Err(Rejection::ThinVolume));
        }
    }

    /// SAFE is never looser than AGGRESSIVE.
    #[test]
    fn safe_implies_aggressive(
        series in arb_series(),
        regime in arb_regime(),
        trend in arb_trend(),
    ) {
        let safe = BreakoutDetector::new(Mode::Safe).detect(&series, regime, trend);
        if let Ok(s) = safe {
            let aggressive = BreakoutDetector::new(Mode::Aggressive)
                .detect(&series, regime, trend)
                .unwrap();
            prop_assert_eq!(s.side, aggressive.side);
        }
    }
}

// ── 3. Score Bounds ──────────────────────────────────────────────────

proptest! {
    /// Score lands in [0, 100] for any price and level, including price == level.
    #[test]
    fn score_is_bounded(
        series in arb_series(),
        price in 0.0..500.0_f64,
        level_offset in -50.0..50.0_f64,
        in_opening_range in any::<bool>(),
    ) {
        for timing in [TimingPolicy::Flat, TimingPolicy::OpeningRange] {
            let engine = ScoreEngine::new(timing);
            let s = engine.score(&series, price, price + level_offset, in_opening_range);
            prop_assert!(s.total <= 100);
            prop_assert!(s.relative_volume <= 40);
            prop_assert!(s.squeeze <= 20);
            prop_assert!(s.strength <= 20);
            prop_assert!(s.timing <= 20);

            let at_level = engine.score(&series, price, price, in_opening_range);
            prop_assert_eq!(at_level.strength, 0);
        }
    }

    /// A base with zero traded volume scores zero on relative volume.
    #[test]
    fn zero_volume_base_is_bounded(
        high in 1.0..100.0_f64,
        width in 0.0..10.0_f64,
        last in 0.0..1e9_f64,
    ) {
        let base = Base { high, low: high - width, avg_volume: 0.0, last_volume: last };
        let s = ScoreEngine::default().score_base(&base, high, high, false);
        prop_assert_eq!(s.relative_volume, 0);
        prop_assert!(s.total <= 100);
    }
}

// ── 4. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn detection_is_deterministic(
        series in arb_series(),
        regime in arb_regime(),
        trend in arb_trend(),
        mode in arb_mode(),
    ) {
        let detector = BreakoutDetector::new(mode);
        prop_assert_eq!(
            detector.detect(&series, regime, trend),
            detector.detect(&series, regime, trend)
        );
    }
}

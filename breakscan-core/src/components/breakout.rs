//! Breakout detector — latest close versus the 20-bar base.
//!
//! The base is the fixed window of bars strictly preceding the latest bar
//! (bars `[-21, -1)`). It approximates the prior session's consolidation;
//! breaking it on elevated volume with trend and regime confirmation is the
//! entry thesis.
//!
//! Evaluation order:
//! 1. price floor on the latest close
//! 2. volume gate: `last_vol >= avg_vol * mode.volume_multiplier()`
//! 3. LONG if close > base high, trend UP, no SAFE-mode BEAR veto
//! 4. SHORT if close < base low, trend DOWN, no SAFE-mode BULL veto
//!
//! Because base high >= base low, at most one side can fire.

use crate::domain::{Bar, BarSeries, Candidate, MarketRegime, Mode, Side, TrendDirection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bars in the consolidation base.
pub const BASE_LEN: usize = 20;

/// Minimum latest close; filters illiquid and penny symbols.
pub const DEFAULT_PRICE_FLOOR: f64 = 5.0;

/// Summary of the base window and the latest bar's volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Base {
    pub high: f64,
    pub low: f64,
    pub avg_volume: f64,
    pub last_volume: f64,
}

impl Base {
    /// Measure the `len`-bar base preceding the latest bar.
    ///
    /// Returns `None` if the series has fewer than `len + 1` bars.
    pub fn measure(series: &BarSeries, len: usize) -> Option<Base> {
        let window = series.window_before_latest(len)?;
        let latest = series.latest()?;
        Some(Self::from_window(window, latest))
    }

    fn from_window(window: &[Bar], latest: &Bar) -> Base {
        let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let total_volume: f64 = window.iter().map(|b| b.volume as f64).sum();
        Base {
            high,
            low,
            avg_volume: total_volume / window.len() as f64,
            last_volume: latest.volume as f64,
        }
    }

    /// `last_volume / avg_volume`, or 0 when the base traded nothing.
    pub fn relative_volume(&self) -> f64 {
        if self.avg_volume > 0.0 {
            self.last_volume / self.avg_volume
        } else {
            0.0
        }
    }
}

/// Why a symbol produced no breakout this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fewer than `base_len + 1` bars.
    ShortSeries,
    BelowPriceFloor,
    ThinVolume,
    InsideRange,
    /// Broke the base against the trend, or the trend is unknown.
    TrendMismatch,
    RegimeVeto,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rejection::ShortSeries => "short series",
            Rejection::BelowPriceFloor => "below price floor",
            Rejection::ThinVolume => "thin volume",
            Rejection::InsideRange => "inside range",
            Rejection::TrendMismatch => "trend mismatch",
            Rejection::RegimeVeto => "regime veto",
        };
        f.write_str(s)
    }
}

/// A detected, not yet scored, breakout.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakout {
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub level: f64,
    pub base: Base,
}

impl Breakout {
    pub fn into_candidate(self, score: u8) -> Candidate {
        Candidate {
            symbol: self.symbol,
            side: self.side,
            price: self.price,
            level: self.level,
            score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutDetector {
    pub mode: Mode,
    pub base_len: usize,
    pub price_floor: f64,
}

impl BreakoutDetector {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            base_len: BASE_LEN,
            price_floor: DEFAULT_PRICE_FLOOR,
        }
    }

    pub fn with_price_floor(mut self, price_floor: f64) -> Self {
        self.price_floor = price_floor;
        self
    }

    pub fn detect(
        &self,
        series: &BarSeries,
        regime: MarketRegime,
        trend: Option<TrendDirection>,
    ) -> Result<Breakout, Rejection> {
        let base = Base::measure(series, self.base_len).ok_or(Rejection::ShortSeries)?;
        let price = series.latest().ok_or(Rejection::ShortSeries)?.close;

        if price < self.price_floor {
            return Err(Rejection::BelowPriceFloor);
        }

        if base.last_volume < base.avg_volume * self.mode.volume_multiplier() {
            return Err(Rejection::ThinVolume);
        }

        let (side, level, wanted_trend) = if price > base.high {
            (Side::Long, base.high, TrendDirection::Up)
        } else if price < base.low {
            (Side::Short, base.low, TrendDirection::Down)
        } else {
            return Err(Rejection::InsideRange);
        };

        if trend != Some(wanted_trend) {
            return Err(Rejection::TrendMismatch);
        }
        if self.mode.vetoes(regime, side) {
            return Err(Rejection::RegimeVeto);
        }

        Ok(Breakout {
            symbol: series.symbol().to_string(),
            side,
            price,
            level,
            base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Interval;
    use chrono::{Duration, TimeZone, Utc};

    /// 30 bars: a flat base with high 100 / low 99 and volume 1000, then a
    /// latest bar closing at `close` with `last_volume`.
    fn breakout_series(close: f64, last_volume: u64) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
        let mut bars: Vec<Bar> = (0..29)
            .map(|i| Bar {
                timestamp: start + Duration::minutes(15 * i),
                open: 99.5,
                high: 100.0,
                low: 99.0,
                close: 99.5,
                volume: 1_000,
            })
            .collect();
        bars.push(Bar {
            timestamp: start + Duration::minutes(15 * 29),
            open: 99.6,
            high: close.max(99.6) + 0.1,
            low: close.min(99.6) - 0.1,
            close,
            volume: last_volume,
        });
        BarSeries::new("AAPL", Interval::FifteenMinute, bars).unwrap()
    }

    #[test]
    fn long_breakout_in_bull_market() {
        let d = BreakoutDetector::new(Mode::Safe);
        let b = d
            .detect(&breakout_series(101.0, 3_000), MarketRegime::Bull, Some(TrendDirection::Up))
            .unwrap();
        assert_eq!(b.side, Side::Long);
        assert_eq!(b.price, 101.0);
        assert_eq!(b.level, 100.0);
        assert_eq!(b.base.avg_volume, 1_000.0);
        assert_eq!(b.base.relative_volume(), 3.0);
    }

    #[test]
    fn short_breakout_needs_down_trend() {
        let d = BreakoutDetector::new(Mode::Safe);
        let series = breakout_series(98.0, 3_000);
        let b = d
            .detect(&series, MarketRegime::Bear, Some(TrendDirection::Down))
            .unwrap();
        assert_eq!(b.side, Side::Short);
        assert_eq!(b.level, 99.0);
        assert_eq!(
            d.detect(&series, MarketRegime::Bear, Some(TrendDirection::Up)),
            Err(Rejection::TrendMismatch)
        );
    }

    #[test]
    fn safe_mode_regime_veto() {
        let d = BreakoutDetector::new(Mode::Safe);
        assert_eq!(
            d.detect(&breakout_series(101.0, 3_000), MarketRegime::Bear, Some(TrendDirection::Up)),
            Err(Rejection::RegimeVeto)
        );
        assert_eq!(
            d.detect(&breakout_series(98.0, 3_000), MarketRegime::Bull, Some(TrendDirection::Down)),
            Err(Rejection::RegimeVeto)
        );
    }

    #[test]
    fn aggressive_mode_ignores_regime() {
        let d = BreakoutDetector::new(Mode::Aggressive);
        assert!(d
            .detect(&breakout_series(101.0, 3_000), MarketRegime::Bear, Some(TrendDirection::Up))
            .is_ok());
    }

    #[test]
    fn volume_gate_depends_on_mode() {
        let series = breakout_series(101.0, 1_500);
        let safe = BreakoutDetector::new(Mode::Safe);
        let aggressive = BreakoutDetector::new(Mode::Aggressive);
        assert_eq!(
            safe.detect(&series, MarketRegime::Bull, Some(TrendDirection::Up)),
            Err(Rejection::ThinVolume)
        );
        assert!(aggressive
            .detect(&series, MarketRegime::Bull, Some(TrendDirection::Up))
            .is_ok());

        // Exactly at the multiplier passes.
        let at_gate = breakout_series(101.0, 2_000);
        assert!(safe
            .detect(&at_gate, MarketRegime::Bull, Some(TrendDirection::Up))
            .is_ok());
    }

    #[test]
    fn price_floor_rejects_penny_stocks() {
        let d = BreakoutDetector::new(Mode::Aggressive).with_price_floor(150.0);
        assert_eq!(
            d.detect(&breakout_series(101.0, 3_000), MarketRegime::Bull, Some(TrendDirection::Up)),
            Err(Rejection::BelowPriceFloor)
        );
    }

    #[test]
    fn close_inside_base_is_no_signal() {
        let d = BreakoutDetector::new(Mode::Aggressive);
        assert_eq!(
            d.detect(&breakout_series(100.0, 3_000), MarketRegime::Bull, Some(TrendDirection::Up)),
            Err(Rejection::InsideRange)
        );
    }

    #[test]
    fn unknown_trend_is_rejected() {
        let d = BreakoutDetector::new(Mode::Aggressive);
        assert_eq!(
            d.detect(&breakout_series(101.0, 3_000), MarketRegime::Bull, None),
            Err(Rejection::TrendMismatch)
        );
    }

    #[test]
    fn base_excludes_latest_bar() {
        // The latest bar's own high (101.1) must not lift the base high.
        let base = Base::measure(&breakout_series(101.0, 3_000), BASE_LEN).unwrap();
        assert_eq!(base.high, 100.0);
        assert_eq!(base.low, 99.0);
        assert_eq!(base.last_volume, 3_000.0);
    }

    #[test]
    fn zero_volume_base_has_zero_rvol() {
        let base = Base {
            high: 1.0,
            low: 1.0,
            avg_volume: 0.0,
            last_volume: 500.0,
        };
        assert_eq!(base.relative_volume(), 0.0);
    }
}

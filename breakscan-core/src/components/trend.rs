//! Trend filter — coarse-timeframe direction for one symbol.
//!
//! UP when the latest close is above the close `lookback` bars earlier,
//! DOWN otherwise. An unavailable or too-short series gives no direction,
//! which suppresses candidate generation for that symbol.

use crate::domain::{BarSeries, TrendDirection};

/// Close-to-close momentum test: `close[latest] > close[latest - lookback]`.
///
/// Returns `None` when the series has fewer than `lookback + 1` bars.
pub fn momentum_up(series: &BarSeries, lookback: usize) -> Option<bool> {
    let latest = series.back(0)?;
    let earlier = series.back(lookback)?;
    Some(latest.close > earlier.close)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendFilter {
    pub lookback: usize,
}

impl TrendFilter {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "lookback must be >= 1");
        Self { lookback }
    }

    pub fn direction(&self, series: Option<&BarSeries>) -> Option<TrendDirection> {
        let up = momentum_up(series?, self.lookback)?;
        Some(if up {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        })
    }
}

impl Default for TrendFilter {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Interval};
    use chrono::{Duration, TimeZone, Utc};

    fn series_from_closes(closes: &[f64]) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + Duration::hours(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000,
            })
            .collect();
        BarSeries::new("AAPL", Interval::SixtyMinute, bars).unwrap()
    }

    #[test]
    fn rising_closes_are_up() {
        let s = series_from_closes(&[100.0, 99.0, 100.0, 101.0, 102.0, 103.0]);
        assert_eq!(TrendFilter::default().direction(Some(&s)), Some(TrendDirection::Up));
    }

    #[test]
    fn flat_closes_are_down() {
        // Strict comparison: equal closes do not count as up.
        let s = series_from_closes(&[100.0; 6]);
        assert_eq!(TrendFilter::default().direction(Some(&s)), Some(TrendDirection::Down));
    }

    #[test]
    fn compares_against_lookback_bar_only() {
        // close[-5] = 100, intermediate spike ignored, latest 101.
        let s = series_from_closes(&[500.0, 100.0, 300.0, 50.0, 20.0, 101.0]);
        assert_eq!(TrendFilter::default().direction(Some(&s)), Some(TrendDirection::Up));
        assert_eq!(TrendFilter::new(1).direction(Some(&s)), Some(TrendDirection::Up));
        assert_eq!(TrendFilter::new(5).direction(Some(&s)), Some(TrendDirection::Down));
    }

    #[test]
    fn unavailable_or_short_series_is_unknown() {
        assert_eq!(TrendFilter::default().direction(None), None);
        let s = series_from_closes(&[100.0, 101.0, 102.0, 103.0]);
        assert_eq!(TrendFilter::default().direction(Some(&s)), None);
    }
}

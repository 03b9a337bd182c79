//! Bar intervals, lookback periods, and the series requests the pipeline makes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar interval supported by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    /// 15-minute bars: breakout detection and market bias.
    FifteenMinute,
    /// 60-minute bars: trend filter.
    SixtyMinute,
}

impl Interval {
    /// Provider query token (`15m`, `60m`).
    pub fn as_query(&self) -> &'static str {
        match self {
            Interval::FifteenMinute => "15m",
            Interval::SixtyMinute => "60m",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Interval::FifteenMinute => 15,
            Interval::SixtyMinute => 60,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// Lookback period for a fetch, in calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub days: u32,
}

impl Period {
    pub const fn days(days: u32) -> Self {
        Self { days }
    }

    /// Provider query token (`5d`, `7d`).
    pub fn as_query(&self) -> String {
        format!("{}d", self.days)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days)
    }
}

/// What the pipeline asks the bar cache for: which series, and how many
/// bars it must contain to be usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesRequest {
    pub interval: Interval,
    pub period: Period,
    pub min_bars: usize,
}

impl SeriesRequest {
    /// Fine-grained series for the breakout detector and score engine.
    pub const BREAKOUT: SeriesRequest = SeriesRequest {
        interval: Interval::FifteenMinute,
        period: Period::days(5),
        min_bars: 30,
    };

    /// Index series for the market bias classifier.
    pub const INDEX_BIAS: SeriesRequest = SeriesRequest {
        interval: Interval::FifteenMinute,
        period: Period::days(5),
        min_bars: 6,
    };

    /// Coarse series for the trend filter.
    pub const TREND: SeriesRequest = SeriesRequest {
        interval: Interval::SixtyMinute,
        period: Period::days(7),
        min_bars: 6,
    };
}

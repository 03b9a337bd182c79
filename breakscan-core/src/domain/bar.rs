//! Bar and BarSeries — the fundamental market data units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::interval::Interval;

/// OHLCV bar for a single symbol over one fixed interval.
///
/// `timestamp` is the bar's open time in UTC, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }
}

/// Errors raised when constructing a [`BarSeries`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index} at {timestamp} is not after its predecessor")]
    NonIncreasingTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {index} at {timestamp} has a NaN price field")]
    VoidBar {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Ordered sequence of bars for one symbol and interval, oldest first.
///
/// The constructor enforces strictly increasing timestamps, so two bars
/// never share a timestamp and `latest()` is always the newest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: String,
    interval: Interval,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        bars: Vec<Bar>,
    ) -> Result<Self, BarError> {
        for (index, bar) in bars.iter().enumerate() {
            if bar.is_void() {
                return Err(BarError::VoidBar {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if index > 0 && bars[index - 1].timestamp >= bar.timestamp {
                return Err(BarError::NonIncreasingTimestamp {
                    index,
                    timestamp: bar.timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            interval,
            bars,
        })
    }

    /// Build a series from provider output that may be unsorted, contain
    /// duplicate timestamps, or contain void bars.
    ///
    /// Void bars are dropped. For duplicated timestamps the last occurrence
    /// wins (providers re-emit the in-progress bar with updated values).
    pub fn from_unordered(
        symbol: impl Into<String>,
        interval: Interval,
        mut bars: Vec<Bar>,
    ) -> Self {
        bars.retain(|b| !b.is_void());
        bars.sort_by_key(|b| b.timestamp);

        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
                _ => deduped.push(bar),
            }
        }

        Self {
            symbol: symbol.into(),
            interval,
            bars: deduped,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bar `back` positions before the latest (0 = latest).
    pub fn back(&self, back: usize) -> Option<&Bar> {
        let n = self.bars.len();
        if back >= n {
            return None;
        }
        self.bars.get(n - 1 - back)
    }

    /// The `len` bars strictly preceding the latest bar, oldest first.
    ///
    /// Returns `None` if the series does not have `len + 1` bars.
    pub fn window_before_latest(&self, len: usize) -> Option<&[Bar]> {
        let n = self.bars.len();
        if len == 0 || n < len + 1 {
            return None;
        }
        Some(&self.bars[n - 1 - len..n - 1])
    }
}

//! Market bias classifier — market-wide regime from two broad-index series.

use super::trend::momentum_up;
use crate::domain::{BarSeries, MarketRegime};

/// Classifies the market from two index series (SPY and QQQ by default).
///
/// Pure: the caller resolves the series through the bar cache and passes
/// `None` for an index that is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeClassifier {
    pub lookback: usize,
}

impl RegimeClassifier {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "lookback must be >= 1");
        Self { lookback }
    }

    pub fn classify(&self, first: Option<&BarSeries>, second: Option<&BarSeries>) -> MarketRegime {
        let first_up = first.and_then(|s| momentum_up(s, self.lookback));
        let second_up = second.and_then(|s| momentum_up(s, self.lookback));

        match (first_up, second_up) {
            (Some(true), Some(true)) => MarketRegime::Bull,
            (Some(false), Some(false)) => MarketRegime::Bear,
            (Some(_), Some(_)) => MarketRegime::Mixed,
            _ => MarketRegime::Neutral,
        }
    }
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self::new(4)
    }
}

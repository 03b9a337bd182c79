//! Signal vocabulary: regime, trend, side, operating mode, and candidates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Market-wide directional regime derived from two broad-index series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    Bull,
    Bear,
    Mixed,
    /// Not enough data to classify.
    Neutral,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketRegime::Bull => "BULL",
            MarketRegime::Bear => "BEAR",
            MarketRegime::Mixed => "MIXED",
            MarketRegime::Neutral => "NEUTRAL",
        };
        f.write_str(s)
    }
}

/// Coarse-timeframe direction of a single symbol.
///
/// An unknown trend is represented as `Option::<TrendDirection>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Up,
    Down,
}

/// Trade direction of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

/// Operating mode. SAFE is strictly more conservative than AGGRESSIVE:
/// a higher volume bar and a regime veto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Safe,
    Aggressive,
}

impl Mode {
    /// Minimum ratio of latest-bar volume to the base average volume.
    pub fn volume_multiplier(&self) -> f64 {
        match self {
            Mode::Safe => 2.0,
            Mode::Aggressive => 1.3,
        }
    }

    /// Whether the regime blocks a breakout on the given side.
    pub fn vetoes(&self, regime: MarketRegime, side: Side) -> bool {
        match (self, side) {
            (Mode::Aggressive, _) => false,
            (Mode::Safe, Side::Long) => regime == MarketRegime::Bear,
            (Mode::Safe, Side::Short) => regime == MarketRegime::Bull,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Safe => f.write_str("SAFE"),
            Mode::Aggressive => f.write_str("AGGRESSIVE"),
        }
    }
}

/// A scored trade idea for one symbol, created fresh each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub side: Side,
    /// Latest close that broke the base.
    pub price: f64,
    /// Base high (long) or base low (short) that was broken.
    pub level: f64,
    pub score: u8,
}

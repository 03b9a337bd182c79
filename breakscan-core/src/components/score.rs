//! Score engine — converts a breakout into a 0–100 confidence score.
//!
//! Four independently capped components, summed and clamped to 100:
//!
//! | component | band | rule |
//! |---|---|---|
//! | relative volume | 0–40 | `floor(rvol * 15)` |
//! | squeeze | 0–20 | base range / price: 20 if < 2%, 10 if < 3% |
//! | breakout strength | 0–20 | `floor(|price - level| / price * 500)` |
//! | timing | 0–20 | per [`TimingPolicy`] |
//!
//! The minimum-score gate applied afterwards is a separate, explicitly
//! configured [`MinScoreGate`].

use super::breakout::{Base, BASE_LEN};
use crate::domain::BarSeries;
use serde::{Deserialize, Serialize};

const RVOL_CAP: u8 = 40;
const SQUEEZE_CAP: u8 = 20;
const STRENGTH_CAP: u8 = 20;
const TIMING_BONUS: u8 = 20;

/// How the timing component is awarded. Chosen per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingPolicy {
    /// Always award the bonus.
    #[default]
    Flat,
    /// Award the bonus only inside the opening-range window.
    OpeningRange,
}

/// Per-component score, kept for notification text and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub relative_volume: u8,
    pub squeeze: u8,
    pub strength: u8,
    pub timing: u8,
    pub total: u8,
}

impl ScoreBreakdown {
    fn from_parts(relative_volume: u8, squeeze: u8, strength: u8, timing: u8) -> Self {
        let sum = u16::from(relative_volume)
            + u16::from(squeeze)
            + u16::from(strength)
            + u16::from(timing);
        Self {
            relative_volume,
            squeeze,
            strength,
            timing,
            total: sum.min(100) as u8,
        }
    }
}

/// `min(cap, floor(value * scale))`, with non-finite or non-positive input
/// scoring zero.
fn capped_points(value: f64, scale: f64, cap: u8) -> u8 {
    let scaled = (value * scale).floor();
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    scaled.min(f64::from(cap)) as u8
}

fn squeeze_points(base: &Base, price: f64) -> u8 {
    if !(price > 0.0) {
        return 0;
    }
    let range_fraction = (base.high - base.low) / price;
    if !range_fraction.is_finite() {
        0
    } else if range_fraction < 0.02 {
        SQUEEZE_CAP
    } else if range_fraction < 0.03 {
        SQUEEZE_CAP / 2
    } else {
        0
    }
}

fn strength_points(price: f64, level: f64) -> u8 {
    if !(price > 0.0) {
        return 0;
    }
    capped_points((price - level).abs() / price, 500.0, STRENGTH_CAP)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreEngine {
    pub timing: TimingPolicy,
}

impl ScoreEngine {
    pub fn new(timing: TimingPolicy) -> Self {
        Self { timing }
    }

    fn timing_points(&self, in_opening_range: bool) -> u8 {
        match self.timing {
            TimingPolicy::Flat => TIMING_BONUS,
            TimingPolicy::OpeningRange if in_opening_range => TIMING_BONUS,
            TimingPolicy::OpeningRange => 0,
        }
    }

    /// Score from an already measured base.
    pub fn score_base(
        &self,
        base: &Base,
        price: f64,
        level: f64,
        in_opening_range: bool,
    ) -> ScoreBreakdown {
        ScoreBreakdown::from_parts(
            capped_points(base.relative_volume(), 15.0, RVOL_CAP),
            squeeze_points(base, price),
            strength_points(price, level),
            self.timing_points(in_opening_range),
        )
    }

    /// Score from the fine-grained series. A series too short to hold a base
    /// earns only the price-derived and timing components.
    pub fn score(
        &self,
        series: &BarSeries,
        price: f64,
        level: f64,
        in_opening_range: bool,
    ) -> ScoreBreakdown {
        match Base::measure(series, BASE_LEN) {
            Some(base) => self.score_base(&base, price, level, in_opening_range),
            None => ScoreBreakdown::from_parts(
                0,
                0,
                strength_points(price, level),
                self.timing_points(in_opening_range),
            ),
        }
    }
}

/// Minimum score a candidate needs to reach the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MinScoreGate {
    Flat { min_score: u8 },
    SessionAware { opening_range: u8, regular: u8 },
}

impl Default for MinScoreGate {
    fn default() -> Self {
        MinScoreGate::Flat { min_score: 60 }
    }
}

impl MinScoreGate {
    /// The 55 / 60 session-aware thresholds.
    pub fn session_aware_default() -> Self {
        MinScoreGate::SessionAware {
            opening_range: 55,
            regular: 60,
        }
    }

    pub fn threshold(&self, in_opening_range: bool) -> u8 {
        match *self {
            MinScoreGate::Flat { min_score } => min_score,
            MinScoreGate::SessionAware { opening_range, .. } if in_opening_range => opening_range,
            MinScoreGate::SessionAware { regular, .. } => regular,
        }
    }

    pub fn passes(&self, score: u8, in_opening_range: bool) -> bool {
        score >= self.threshold(in_opening_range)
    }
}

//! Signal scheduler — per-symbol cooldowns, the daily cap, and top-N selection.
//!
//! The scheduler is the only stateful part of the pipeline besides the
//! caches. Its state is owned by the scanner and mutated through `&mut self`
//! from the single control loop.

use breakscan_core::domain::Candidate;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub max_signals_per_day: u32,
    pub cooldown: Duration,
    /// `None` selects every qualifying candidate up to the remaining cap.
    pub top_n: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_signals_per_day: 3,
            cooldown: Duration::minutes(90),
            top_n: Some(3),
        }
    }
}

/// Mutable scheduling state. Lost on restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub last_signal_time: HashMap<String, DateTime<Utc>>,
    pub signals_emitted_today: u32,
    pub current_day: Option<NaiveDate>,
}

/// Order candidates by score descending, then symbol ascending, and keep
/// the first `limit`.
pub fn rank_candidates(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.symbol.cmp(&b.symbol)));
    candidates.truncate(limit);
    candidates
}

#[derive(Debug, Clone, Default)]
pub struct SignalScheduler {
    config: SchedulerConfig,
    state: SchedulerState,
}

impl SignalScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: SchedulerState::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Observe the current trading day. Resets the daily counter when the day
    /// differs from the last one seen; returns true on that reset.
    pub fn roll_day(&mut self, day: NaiveDate) -> bool {
        match self.state.current_day {
            Some(current) if current == day => false,
            Some(previous) => {
                tracing::info!(
                    %previous,
                    %day,
                    emitted = self.state.signals_emitted_today,
                    "new trading day, daily signal counter reset"
                );
                self.state.current_day = Some(day);
                self.state.signals_emitted_today = 0;
                true
            }
            None => {
                self.state.current_day = Some(day);
                false
            }
        }
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.config
            .max_signals_per_day
            .saturating_sub(self.state.signals_emitted_today)
    }

    pub fn is_capped(&self) -> bool {
        self.remaining_capacity() == 0
    }

    /// True while `now < last_signal + cooldown`.
    pub fn is_cooling_down(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.state
            .last_signal_time
            .get(symbol)
            .is_some_and(|last| now < *last + self.config.cooldown)
    }

    /// Pure selection over this tick's candidates.
    pub fn select(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let capacity = self.remaining_capacity() as usize;
        let limit = match self.config.top_n {
            Some(n) => n.min(capacity),
            None => capacity,
        };
        rank_candidates(candidates, limit)
    }

    /// Record a dispatched signal. Never rolled back, even when delivery fails.
    pub fn record_dispatch(&mut self, symbol: &str, now: DateTime<Utc>) {
        self.state.last_signal_time.insert(symbol.to_string(), now);
        self.state.signals_emitted_today += 1;
    }
}

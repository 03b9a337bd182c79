//! Control loop: tick, pick the delay from the outcome, sleep, repeat.
//!
//! A tick degrades on bad data instead of failing, so the only tick error is
//! a panic. It is caught here, logged, and followed by the error back-off.
//! Nothing that happens inside a tick stops the loop.

use crate::config::CadenceConfig;
use crate::scanner::{ScanError, Scanner, TickOutcome};
use chrono::{DateTime, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

/// Time source and sleeper for the loop.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

/// Wall clock with real sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Delays between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub scan: Duration,
    pub idle: Duration,
    pub error: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self::from_config(&CadenceConfig::default())
    }
}

impl Cadence {
    pub fn from_config(config: &CadenceConfig) -> Self {
        Self {
            scan: Duration::from_secs(u64::from(config.scan_minutes) * 60),
            idle: Duration::from_secs(u64::from(config.idle_minutes) * 60),
            error: Duration::from_secs(u64::from(config.error_backoff_secs)),
        }
    }

    pub fn delay_after(&self, outcome: &Result<TickOutcome, ScanError>) -> Duration {
        match outcome {
            Ok(TickOutcome::Scanned(_)) => self.scan,
            Ok(TickOutcome::OutsideHours | TickOutcome::DailyCapReached) => self.idle,
            Err(_) => self.error,
        }
    }
}

/// Totals over one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub scanned: u64,
    pub idle: u64,
    pub errors: u64,
    pub dispatched: u64,
}

/// Run one tick with panics converted to [`ScanError::Panicked`].
pub fn guarded_tick(scanner: &mut Scanner, now: DateTime<Utc>) -> Result<TickOutcome, ScanError> {
    match catch_unwind(AssertUnwindSafe(|| scanner.tick(now))) {
        Ok(outcome) => Ok(outcome),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ScanError::Panicked(message))
        }
    }
}

/// Drive `scanner` until `max_ticks` ticks have run, or forever when `None`.
///
/// No sleep follows the final tick of a bounded run.
pub fn run_loop(
    scanner: &mut Scanner,
    clock: &dyn Clock,
    cadence: &Cadence,
    max_ticks: Option<u64>,
) -> RunSummary {
    let mut summary = RunSummary::default();
    loop {
        let now = clock.now();
        let outcome = guarded_tick(scanner, now);
        summary.ticks += 1;

        match &outcome {
            Ok(TickOutcome::Scanned(report)) => {
                summary.scanned += 1;
                summary.dispatched += report.dispatched.len() as u64;
            }
            Ok(_) => summary.idle += 1,
            Err(e) => {
                summary.errors += 1;
                tracing::error!(error = %e, "tick failed, backing off");
            }
        }

        if max_ticks.is_some_and(|max| summary.ticks >= max) {
            break;
        }

        let delay = cadence.delay_after(&outcome);
        tracing::debug!(delay_secs = delay.as_secs(), "sleeping until next tick");
        clock.sleep(delay);
    }
    tracing::info!(
        ticks = summary.ticks,
        scanned = summary.scanned,
        errors = summary.errors,
        dispatched = summary.dispatched,
        "scanner loop finished"
    );
    summary
}

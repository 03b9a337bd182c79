//! Breakscan Runner — scan orchestration on top of `breakscan-core`.
//!
//! This crate provides:
//! - TOML configuration with validation and fingerprinting
//! - Trading session (time zone, window, opening range)
//! - Signal scheduler (cooldowns, daily cap, top-N selection)
//! - Notifiers (Telegram, log-only) and message formatting
//! - The per-tick scanner and the control loop around it

pub mod config;
pub mod driver;
pub mod notifier;
pub mod scanner;
pub mod scheduler;
pub mod session;

pub use config::{ConfigError, EarningsSource, ScannerConfig, TelegramCredentials};
pub use driver::{guarded_tick, run_loop, Cadence, Clock, RunSummary, SystemClock};
pub use notifier::{LogNotifier, Notifier, NotifyError, TelegramNotifier};
pub use scanner::{ScanError, Scanner, TickOutcome, TickReport};
pub use scheduler::{rank_candidates, SchedulerConfig, SchedulerState, SignalScheduler};
pub use session::TradingSession;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<ScannerConfig>();
        assert_sync::<ScannerConfig>();
    }

    #[test]
    fn scheduler_is_send_sync() {
        assert_send::<SignalScheduler>();
        assert_sync::<SignalScheduler>();
        assert_send::<SchedulerState>();
        assert_sync::<SchedulerState>();
    }

    #[test]
    fn notifiers_are_send_sync() {
        assert_send::<LogNotifier>();
        assert_sync::<LogNotifier>();
        assert_send::<TelegramNotifier>();
        assert_sync::<TelegramNotifier>();
    }

    #[test]
    fn tick_report_is_send_sync() {
        assert_send::<TickReport>();
        assert_sync::<TickReport>();
    }

    #[test]
    fn session_is_send_sync() {
        assert_send::<TradingSession>();
        assert_sync::<TradingSession>();
    }
}

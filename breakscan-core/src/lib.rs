//! Breakscan Core — bar series, market data, and the signal components.
//!
//! This crate contains the deterministic half of the scanner:
//! - Domain types (bars, series, regime, trend, side, mode, candidates)
//! - Bar providers (Yahoo Finance, synthetic) behind the `BarProvider` trait
//! - The time-bounded bar cache and its `Unavailable` outcomes
//! - Earnings guard and ticker universe
//! - Regime classifier, trend filter, breakout detector, score engine
//!
//! Scheduling, configuration, notification, and the control loop live in
//! `breakscan-runner`.

pub mod components;
pub mod data;
pub mod domain;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types crossing the runner boundary are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::Candidate>();
        require_sync::<domain::Candidate>();

        require_send::<data::BarCache>();
        require_sync::<data::BarCache>();
        require_send::<data::EarningsGuard>();
        require_sync::<data::EarningsGuard>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();

        require_send::<components::BreakoutDetector>();
        require_sync::<components::BreakoutDetector>();
        require_send::<components::ScoreEngine>();
        require_sync::<components::ScoreEngine>();
    }

    /// Architecture contract: components take series, never the cache or a provider.
    #[test]
    fn components_are_pure_over_series() {
        fn _check(
            series: &domain::BarSeries,
            detector: &components::BreakoutDetector,
            engine: &components::ScoreEngine,
        ) -> Option<u8> {
            let regime =
                components::RegimeClassifier::default().classify(Some(series), Some(series));
            let trend = components::TrendFilter::default().direction(Some(series));
            let breakout = detector.detect(series, regime, trend).ok()?;
            Some(engine.score(series, breakout.price, breakout.level, false).total)
        }
    }
}

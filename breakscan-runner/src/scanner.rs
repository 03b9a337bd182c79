//! Scanner — one tick of the signal pipeline.
//!
//! Per tick:
//! 1. roll the trading day, then the trading-hours and daily-cap gates
//! 2. refresh the earnings block set when due
//! 3. classify the market regime from the two index series
//! 4. per eligible symbol: trend, breakout, score, min-score gate
//! 5. select the top-ranked candidates and dispatch them
//!
//! Data problems degrade a single symbol (or the regime to NEUTRAL) and are
//! counted in the [`TickReport`]. An unavailable provider is one such
//! problem: the cache keeps serving what it already holds. [`ScanError`] is
//! reserved for ticks that blew up, see [`crate::driver::guarded_tick`].

use crate::config::{ConfigError, ScannerConfig};
use crate::notifier::{format_signal, format_startup, Notifier, NotifyError};
use crate::scheduler::{SchedulerConfig, SignalScheduler};
use crate::session::TradingSession;
use breakscan_core::components::{
    BreakoutDetector, MinScoreGate, RegimeClassifier, ScoreBreakdown, ScoreEngine, TrendFilter,
};
use breakscan_core::data::{
    BarCache, BarProvider, CacheStats, EarningsFeed, EarningsGuard, Unavailable, Universe,
};
use breakscan_core::domain::{BarSeries, Candidate, MarketRegime, Mode, SeriesRequest};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A tick that could not run.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("tick panicked: {0}")]
    Panicked(String),
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    OutsideHours,
    DailyCapReached,
    Scanned(TickReport),
}

/// Counters and results of one scanning tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub trading_day: NaiveDate,
    pub regime: MarketRegime,
    pub in_opening_range: bool,
    pub scanned: usize,
    pub skipped_cooldown: usize,
    pub skipped_earnings: usize,
    pub unavailable: usize,
    pub rejected: usize,
    pub below_gate: usize,
    /// Every candidate that passed the gate, best first.
    pub candidates: Vec<Candidate>,
    pub dispatched: Vec<Candidate>,
    pub delivery_failures: usize,
    pub cache: CacheStats,
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tick {} (trading day {})", self.at.to_rfc3339(), self.trading_day)?;
        writeln!(
            f,
            "  regime {}{}",
            self.regime,
            if self.in_opening_range { ", opening range" } else { "" }
        )?;
        writeln!(
            f,
            "  scanned {} | cooldown {} | earnings {} | unavailable {} | rejected {} | below gate {}",
            self.scanned,
            self.skipped_cooldown,
            self.skipped_earnings,
            self.unavailable,
            self.rejected,
            self.below_gate
        )?;
        writeln!(
            f,
            "  cache hits {} | refreshes {} | failures {} | stale served {}",
            self.cache.hits, self.cache.refreshes, self.cache.failures, self.cache.stale_served
        )?;
        for c in &self.candidates {
            let mark = if self.dispatched.iter().any(|d| d.symbol == c.symbol) {
                "*"
            } else {
                " "
            };
            writeln!(
                f,
                "  {mark} {:<6} {:<5} price {:>9.2} level {:>9.2} score {:>3}",
                c.symbol,
                c.side.to_string(),
                c.price,
                c.level,
                c.score
            )?;
        }
        write!(
            f,
            "  dispatched {} (delivery failures {})",
            self.dispatched.len(),
            self.delivery_failures
        )
    }
}

/// Owns every piece of mutable pipeline state and the I/O adapters.
pub struct Scanner {
    mode: Mode,
    universe: Vec<String>,
    bias_indices: [String; 2],
    session: TradingSession,
    regime: RegimeClassifier,
    trend: TrendFilter,
    detector: BreakoutDetector,
    engine: ScoreEngine,
    gate: MinScoreGate,
    cache: BarCache,
    scheduler: SignalScheduler,
    earnings: EarningsGuard,
    provider: Arc<dyn BarProvider>,
    notifier: Arc<dyn Notifier>,
    earnings_feed: Option<Arc<dyn EarningsFeed>>,
}

impl Scanner {
    pub fn new(
        config: &ScannerConfig,
        universe: &Universe,
        provider: Arc<dyn BarProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let data = &config.data;
        let bias_indices = match data.bias_indices.as_slice() {
            [a, b] => [a.trim().to_ascii_uppercase(), b.trim().to_ascii_uppercase()],
            _ => {
                return Err(ConfigError::Invalid(
                    "data.bias_indices must name exactly two symbols".to_string(),
                ))
            }
        };
        let universe = universe.tickers();
        if universe.is_empty() {
            return Err(ConfigError::Invalid("universe has no tickers".to_string()));
        }

        Ok(Self {
            mode: config.scanner.mode,
            universe,
            bias_indices,
            session: TradingSession::from_config(&config.session)?,
            regime: RegimeClassifier::new(data.momentum_lookback),
            trend: TrendFilter::new(data.momentum_lookback),
            detector: BreakoutDetector::new(config.scanner.mode).with_price_floor(data.price_floor),
            engine: ScoreEngine::new(config.scoring.timing),
            gate: config.scoring.gate,
            cache: BarCache::new(
                Duration::minutes(i64::from(data.cache_ttl_minutes)),
                Duration::seconds(i64::from(data.failure_backoff_secs)),
            ),
            scheduler: SignalScheduler::new(SchedulerConfig {
                max_signals_per_day: config.scanner.max_signals_per_day,
                cooldown: Duration::minutes(i64::from(config.scanner.cooldown_minutes)),
                top_n: config.scanner.top_n,
            }),
            earnings: EarningsGuard::new(
                Duration::hours(i64::from(config.earnings.refresh_hours)),
                Duration::minutes(i64::from(config.earnings.retry_minutes)),
            ),
            provider,
            notifier,
            earnings_feed: None,
        })
    }

    pub fn with_earnings_feed(mut self, feed: Arc<dyn EarningsFeed>) -> Self {
        self.earnings_feed = Some(feed);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn session(&self) -> &TradingSession {
        &self.session
    }

    pub fn scheduler(&self) -> &SignalScheduler {
        &self.scheduler
    }

    pub fn cache(&self) -> &BarCache {
        &self.cache
    }

    pub fn earnings(&self) -> &EarningsGuard {
        &self.earnings
    }

    /// Announce the scanner on the notification channel.
    pub fn notify_startup(&self, fingerprint: &str) -> Result<(), NotifyError> {
        self.notifier
            .send(&format_startup(self.mode, self.universe.len(), fingerprint))
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let trading_day = self.session.trading_day(now);
        self.scheduler.roll_day(trading_day);

        if !self.session.is_open(now) {
            tracing::debug!(%now, "outside trading hours");
            return TickOutcome::OutsideHours;
        }
        if self.scheduler.is_capped() {
            tracing::info!(
                emitted = self.scheduler.state().signals_emitted_today,
                "daily signal cap reached"
            );
            return TickOutcome::DailyCapReached;
        }
        if !self.provider.is_available() {
            tracing::warn!(
                provider = self.provider.name(),
                "bar provider unavailable, scanning from cached bars"
            );
        }

        if let Some(feed) = &self.earnings_feed {
            self.earnings.refresh_if_due(feed.as_ref(), now);
        }

        let regime = self.classify_regime(now);
        let in_opening_range = self.session.in_opening_range(now);
        let mut report = TickReport {
            at: now,
            trading_day,
            regime,
            in_opening_range,
            scanned: 0,
            skipped_cooldown: 0,
            skipped_earnings: 0,
            unavailable: 0,
            rejected: 0,
            below_gate: 0,
            candidates: Vec::new(),
            dispatched: Vec::new(),
            delivery_failures: 0,
            cache: CacheStats::default(),
        };

        let mut breakdowns: HashMap<String, ScoreBreakdown> = HashMap::new();
        let symbols = self.universe.clone();
        for symbol in &symbols {
            if self.scheduler.is_cooling_down(symbol, now) {
                report.skipped_cooldown += 1;
                continue;
            }
            if self.earnings.is_blocked(symbol) {
                report.skipped_earnings += 1;
                continue;
            }
            report.scanned += 1;

            match self.evaluate(symbol, regime, in_opening_range, now) {
                Evaluation::Unavailable => report.unavailable += 1,
                Evaluation::Rejected => report.rejected += 1,
                Evaluation::BelowGate => report.below_gate += 1,
                Evaluation::Candidate(candidate, breakdown) => {
                    breakdowns.insert(candidate.symbol.clone(), breakdown);
                    report.candidates.push(candidate);
                }
            }
        }

        report.candidates = crate::scheduler::rank_candidates(report.candidates, usize::MAX);
        let selected = self.scheduler.select(report.candidates.clone());
        for candidate in selected {
            self.scheduler.record_dispatch(&candidate.symbol, now);
            let breakdown = breakdowns
                .get(&candidate.symbol)
                .copied()
                .unwrap_or_default();
            let text = format_signal(&candidate, &breakdown, regime, self.mode);
            if let Err(e) = self.notifier.send(&text) {
                report.delivery_failures += 1;
                tracing::warn!(
                    symbol = %candidate.symbol,
                    notifier = self.notifier.name(),
                    error = %e,
                    "signal delivery failed"
                );
            }
            tracing::info!(
                symbol = %candidate.symbol,
                side = %candidate.side,
                score = candidate.score,
                %regime,
                "signal dispatched"
            );
            report.dispatched.push(candidate);
        }

        report.cache = self.cache.take_stats();
        tracing::info!(
            %regime,
            scanned = report.scanned,
            cooldown = report.skipped_cooldown,
            earnings = report.skipped_earnings,
            unavailable = report.unavailable,
            candidates = report.candidates.len(),
            dispatched = report.dispatched.len(),
            "tick complete"
        );
        TickOutcome::Scanned(report)
    }

    fn classify_regime(&mut self, now: DateTime<Utc>) -> MarketRegime {
        let [first, second] = self.bias_indices.clone();
        let a = self.fetch(&first, SeriesRequest::INDEX_BIAS, now);
        let b = self.fetch(&second, SeriesRequest::INDEX_BIAS, now);
        self.regime.classify(a.as_deref(), b.as_deref())
    }

    fn fetch(
        &mut self,
        symbol: &str,
        request: SeriesRequest,
        now: DateTime<Utc>,
    ) -> Option<Arc<BarSeries>> {
        match self.cache.get(self.provider.as_ref(), symbol, request, now) {
            Ok(series) => Some(series),
            Err(e) => {
                log_unavailable(&e, request);
                None
            }
        }
    }

    fn evaluate(
        &mut self,
        symbol: &str,
        regime: MarketRegime,
        in_opening_range: bool,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let Some(series) = self.fetch(symbol, SeriesRequest::BREAKOUT, now) else {
            return Evaluation::Unavailable;
        };
        let hourly = self.fetch(symbol, SeriesRequest::TREND, now);
        let trend = self.trend.direction(hourly.as_deref());

        let breakout = match self.detector.detect(&series, regime, trend) {
            Ok(b) => b,
            Err(rejection) => {
                tracing::debug!(symbol, %rejection, "no breakout");
                return Evaluation::Rejected;
            }
        };

        let breakdown = self.engine.score_base(
            &breakout.base,
            breakout.price,
            breakout.level,
            in_opening_range,
        );
        if !self.gate.passes(breakdown.total, in_opening_range) {
            tracing::debug!(
                symbol,
                score = breakdown.total,
                threshold = self.gate.threshold(in_opening_range),
                "below minimum score"
            );
            return Evaluation::BelowGate;
        }
        Evaluation::Candidate(breakout.into_candidate(breakdown.total), breakdown)
    }
}

enum Evaluation {
    Unavailable,
    Rejected,
    BelowGate,
    Candidate(Candidate, ScoreBreakdown),
}

fn log_unavailable(e: &Unavailable, request: SeriesRequest) {
    match e {
        Unavailable::InsufficientBars { .. } => {
            tracing::debug!(interval = %request.interval, reason = %e, "series unavailable")
        }
        _ => tracing::warn!(interval = %request.interval, reason = %e, "series unavailable"),
    }
}

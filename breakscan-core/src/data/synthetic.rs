//! In-memory synthetic bar provider.
//!
//! Two uses: offline runs (`--synthetic`), where unknown symbols get a
//! deterministic random walk seeded from the symbol name, and tests, where
//! series are inserted explicitly and failures are injected per symbol.
//! Results produced on synthetic data are for plumbing checks only.

use super::provider::{BarProvider, DataError};
use crate::domain::{Bar, Interval, Period};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Regular-session minutes per trading day.
const SESSION_MINUTES: i64 = 390;

#[derive(Debug, Default)]
struct SyntheticState {
    series: HashMap<(String, Interval), Vec<Bar>>,
    failing: HashSet<String>,
    fetches: HashMap<String, usize>,
}

/// Bar provider backed by in-memory series.
#[derive(Debug, Default)]
pub struct SyntheticProvider {
    state: Mutex<SyntheticState>,
    random_walk_anchor: Option<DateTime<Utc>>,
}

impl SyntheticProvider {
    /// Empty provider: only explicitly inserted series are served.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that generates a random walk ending at `anchor` for any
    /// symbol without an explicit series.
    pub fn random_walk(anchor: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::default(),
            random_walk_anchor: Some(anchor),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SyntheticState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, symbol: &str, interval: Interval, bars: Vec<Bar>) {
        self.lock().series.insert((symbol.to_string(), interval), bars);
    }

    /// Insert `count` identical bars at `price`, the last one opening at `end`.
    pub fn insert_flat(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
        end: DateTime<Utc>,
        price: f64,
    ) {
        let bars = (0..count)
            .map(|i| {
                let back = (count - 1 - i) as i64;
                Bar {
                    timestamp: end - Duration::minutes(back * interval.minutes()),
                    open: price,
                    high: price + 0.5,
                    low: price - 0.5,
                    close: price,
                    volume: 10_000,
                }
            })
            .collect();
        self.insert(symbol, interval, bars);
    }

    /// Make every subsequent fetch for `symbol` fail.
    pub fn fail_symbol(&self, symbol: &str) {
        self.lock().failing.insert(symbol.to_string());
    }

    pub fn recover_symbol(&self, symbol: &str) {
        self.lock().failing.remove(symbol);
    }

    /// Number of fetch calls made for `symbol`, across all intervals.
    pub fn fetch_count(&self, symbol: &str) -> usize {
        self.lock().fetches.get(symbol).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.lock().fetches.values().sum()
    }
}

impl BarProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<Vec<Bar>, DataError> {
        let mut state = self.lock();
        *state.fetches.entry(symbol.to_string()).or_default() += 1;

        if state.failing.contains(symbol) {
            return Err(DataError::NetworkUnreachable(format!(
                "synthetic outage for {symbol}"
            )));
        }

        if let Some(bars) = state.series.get(&(symbol.to_string(), interval)) {
            return Ok(bars.clone());
        }

        match self.random_walk_anchor {
            Some(anchor) => Ok(generate_random_walk(symbol, interval, period, anchor)),
            None => Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Deterministic intraday random walk: bars spaced one interval apart,
/// the last opening at `anchor`. Session gaps are not modelled.
pub fn generate_random_walk(
    symbol: &str,
    interval: Interval,
    period: Period,
    anchor: DateTime<Utc>,
) -> Vec<Bar> {
    let seed_bytes = blake3::hash(format!("{symbol}:{interval}").as_bytes());
    let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

    let per_day = (SESSION_MINUTES + interval.minutes() - 1) / interval.minutes();
    let count = (per_day * i64::from(period.days)).max(1);

    let mut price = rng.gen_range(20.0..400.0_f64);
    let mut bars = Vec::with_capacity(count as usize);
    for i in 0..count {
        let step: f64 = rng.gen_range(-0.006..0.006);
        let open = price;
        let close = price * (1.0 + step);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.003));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.003));
        let volume = rng.gen_range(20_000..400_000u64);

        bars.push(Bar {
            timestamp: anchor - Duration::minutes((count - 1 - i) * interval.minutes()),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    bars
}

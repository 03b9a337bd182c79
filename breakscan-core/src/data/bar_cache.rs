//! In-memory, time-bounded bar cache.
//!
//! Entries are keyed by `(symbol, interval, period)` and considered stale once
//! `now - fetched_at > ttl`. A stale or missing lookup triggers exactly one
//! provider fetch. When that fetch fails, the previous series (if any) is
//! served; the failure is remembered so further lookups of the same key
//! within `failure_backoff` do not hit the provider again.
//!
//! The minimum-bar gate is applied per request, after retrieval: an
//! undersized series is `Unavailable` no matter how fresh it is.

use super::provider::{BarProvider, DataError};
use crate::domain::{BarSeries, Interval, Period, SeriesRequest};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Why a series could not be served. Always degrades one symbol, never a tick.
#[derive(Debug, Clone, Error)]
pub enum Unavailable {
    #[error("{symbol}: provider failed and nothing is cached: {source}")]
    Provider {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("{symbol}: refresh failed recently, waiting before retrying")]
    RecentFailure { symbol: String },

    #[error("{symbol}: only {have} bars, need {need}")]
    InsufficientBars {
        symbol: String,
        have: usize,
        need: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    symbol: String,
    interval: Interval,
    period: Period,
}

/// A cached series and when it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub series: Arc<BarSeries>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at > ttl
    }
}

/// Counters for one cache, reset with [`BarCache::take_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub refreshes: u64,
    pub failures: u64,
    pub stale_served: u64,
}

/// Time-bounded memoization of bar series.
#[derive(Debug)]
pub struct BarCache {
    ttl: Duration,
    failure_backoff: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
    failures: HashMap<CacheKey, DateTime<Utc>>,
    stats: CacheStats,
}

impl BarCache {
    pub fn new(ttl: Duration, failure_backoff: Duration) -> Self {
        Self {
            ttl,
            failure_backoff,
            entries: HashMap::new(),
            failures: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// 20-minute TTL, 60-second failure backoff.
    pub fn with_defaults() -> Self {
        Self::new(Duration::minutes(20), Duration::seconds(60))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a series, refreshing it from `provider` when stale or absent.
    pub fn get(
        &mut self,
        provider: &dyn BarProvider,
        symbol: &str,
        request: SeriesRequest,
        now: DateTime<Utc>,
    ) -> Result<Arc<BarSeries>, Unavailable> {
        let key = CacheKey {
            symbol: symbol.to_string(),
            interval: request.interval,
            period: request.period,
        };

        let needs_refresh = self
            .entries
            .get(&key)
            .map_or(true, |entry| entry.is_stale(now, self.ttl));

        let mut refresh_error = None;
        if needs_refresh {
            if self.in_failure_backoff(&key, now) {
                tracing::debug!(
                    symbol,
                    interval = %request.interval,
                    "skipping refresh during failure backoff"
                );
            } else if let Err(e) = self.refresh(provider, &key, now) {
                refresh_error = Some(e);
            }
        } else {
            self.stats.hits += 1;
        }

        let Some(entry) = self.entries.get(&key) else {
            return Err(match refresh_error {
                Some(source) => Unavailable::Provider {
                    symbol: symbol.to_string(),
                    source,
                },
                None => Unavailable::RecentFailure {
                    symbol: symbol.to_string(),
                },
            });
        };

        if entry.is_stale(now, self.ttl) {
            self.stats.stale_served += 1;
            tracing::warn!(
                symbol,
                interval = %request.interval,
                fetched_at = %entry.fetched_at,
                "serving stale series after failed refresh"
            );
        }

        let have = entry.series.len();
        if have < request.min_bars {
            return Err(Unavailable::InsufficientBars {
                symbol: symbol.to_string(),
                have,
                need: request.min_bars,
            });
        }

        Ok(Arc::clone(&entry.series))
    }

    fn in_failure_backoff(&self, key: &CacheKey, now: DateTime<Utc>) -> bool {
        self.failures
            .get(key)
            .is_some_and(|failed_at| now - *failed_at < self.failure_backoff)
    }

    /// One fetch attempt. On failure the existing entry is left untouched.
    fn refresh(
        &mut self,
        provider: &dyn BarProvider,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> Result<(), DataError> {
        let fetched = provider
            .fetch(&key.symbol, key.interval, key.period)
            .and_then(|bars| {
                let series = BarSeries::from_unordered(key.symbol.clone(), key.interval, bars);
                if series.is_empty() {
                    Err(DataError::Empty {
                        symbol: key.symbol.clone(),
                        interval: key.interval,
                        period: key.period,
                    })
                } else {
                    Ok(series)
                }
            });

        match fetched {
            Ok(series) => {
                self.stats.refreshes += 1;
                self.failures.remove(key);
                self.entries.insert(
                    key.clone(),
                    CacheEntry {
                        series: Arc::new(series),
                        fetched_at: now,
                    },
                );
                Ok(())
            }
            Err(e) => {
                self.stats.failures += 1;
                self.failures.insert(key.clone(), now);
                tracing::warn!(
                    symbol = %key.symbol,
                    interval = %key.interval,
                    provider = provider.name(),
                    error = %e,
                    "bar refresh failed"
                );
                Err(e)
            }
        }
    }

    /// Cached entry for a key, regardless of staleness.
    pub fn peek(&self, symbol: &str, interval: Interval, period: Period) -> Option<&CacheEntry> {
        self.entries.get(&CacheKey {
            symbol: symbol.to_string(),
            interval,
            period,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the counters accumulated since the last call and reset them.
    pub fn take_stats(&mut self) -> CacheStats {
        std::mem::take(&mut self.stats)
    }
}

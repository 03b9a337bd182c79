//! Bar provider trait and structured error types.
//!
//! The BarProvider trait abstracts over data sources (Yahoo Finance, the
//! synthetic in-memory provider) so the cache and scanner can be exercised
//! without a network.

use crate::domain::{Bar, Interval, Period};
use thiserror::Error;

/// Structured error types for data operations.
///
/// Every variant is non-fatal to a scan: the affected symbol simply yields
/// no signal this tick.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no bars returned for {symbol} ({interval}, {period})")]
    Empty {
        symbol: String,
        interval: Interval,
        period: Period,
    },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for bar providers.
///
/// Implementations return bars oldest first but are not required to
/// deduplicate; the cache layer canonicalizes what it stores. Providers must
/// turn every failure (unknown symbol, outage, timeout) into a `DataError`
/// rather than panicking.
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for a symbol at the given interval over the trailing period.
    fn fetch(&self, symbol: &str, interval: Interval, period: Period)
        -> Result<Vec<Bar>, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

//! Earnings guard: symbols with an imminent earnings report are excluded
//! from scanning.
//!
//! The block set is refreshed on a fixed cadence (24 hours). A failed refresh
//! keeps the previous set untouched and is retried after a shorter delay.

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Source of upcoming earnings dates.
pub trait EarningsFeed: Send + Sync {
    fn name(&self) -> &str;

    /// Symbols reporting earnings soon enough to be blocked at `now`.
    fn fetch_upcoming(&self, now: DateTime<Utc>) -> Result<BTreeSet<String>, DataError>;
}

/// Owned block set plus its refresh schedule.
#[derive(Debug, Clone)]
pub struct EarningsGuard {
    blocked: BTreeSet<String>,
    last_success: Option<DateTime<Utc>>,
    last_attempt: Option<DateTime<Utc>>,
    refresh_every: Duration,
    retry_after_failure: Duration,
}

impl EarningsGuard {
    pub fn new(refresh_every: Duration, retry_after_failure: Duration) -> Self {
        Self {
            blocked: BTreeSet::new(),
            last_success: None,
            last_attempt: None,
            refresh_every,
            retry_after_failure,
        }
    }

    /// 24-hour cadence, one-hour retry after a failed refresh.
    pub fn daily() -> Self {
        Self::new(Duration::hours(24), Duration::hours(1))
    }

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        match (self.last_success, self.last_attempt) {
            (None, None) => true,
            (Some(ok), Some(attempt)) if ok >= attempt => now - ok >= self.refresh_every,
            (_, Some(attempt)) => now - attempt >= self.retry_after_failure,
            (Some(ok), None) => now - ok >= self.refresh_every,
        }
    }

    /// Refresh from `feed` if the cadence says so. Returns true when the
    /// block set was replaced.
    pub fn refresh_if_due(&mut self, feed: &dyn EarningsFeed, now: DateTime<Utc>) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.last_attempt = Some(now);

        match feed.fetch_upcoming(now) {
            Ok(symbols) => {
                tracing::info!(
                    feed = feed.name(),
                    blocked = symbols.len(),
                    "earnings block set refreshed"
                );
                self.blocked = symbols;
                self.last_success = Some(now);
                true
            }
            Err(e) => {
                tracing::warn!(
                    feed = feed.name(),
                    error = %e,
                    kept = self.blocked.len(),
                    "earnings refresh failed, keeping previous block set"
                );
                false
            }
        }
    }

    pub fn is_blocked(&self, symbol: &str) -> bool {
        self.blocked.contains(symbol)
    }

    pub fn blocked(&self) -> &BTreeSet<String> {
        &self.blocked
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }
}

/// Fixed block list, e.g. maintained by hand in the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticEarningsFeed {
    symbols: BTreeSet<String>,
}

impl StaticEarningsFeed {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: symbols
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .collect(),
        }
    }
}

impl EarningsFeed for StaticEarningsFeed {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_upcoming(&self, _now: DateTime<Utc>) -> Result<BTreeSet<String>, DataError> {
        Ok(self.symbols.clone())
    }
}

// ── Yahoo quoteSummary calendarEvents ───────────────────────────────

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryData>>,
    error: Option<SummaryError>,
}

#[derive(Debug, Deserialize)]
struct SummaryError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    #[serde(rename = "calendarEvents")]
    calendar_events: Option<CalendarEvents>,
}

#[derive(Debug, Deserialize)]
struct CalendarEvents {
    earnings: Option<EarningsEvents>,
}

#[derive(Debug, Deserialize)]
struct EarningsEvents {
    #[serde(rename = "earningsDate", default)]
    earnings_date: Vec<RawTimestamp>,
}

#[derive(Debug, Deserialize)]
struct RawTimestamp {
    raw: i64,
}

/// Earnings dates from Yahoo's quoteSummary endpoint, one request per symbol.
///
/// Symbols Yahoo does not know are skipped: without a calendar there is
/// nothing to block. Any other per-symbol failure fails the whole refresh, so
/// a partial answer never silently unblocks a symbol.
pub struct YahooEarningsFeed {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    symbols: Vec<String>,
    horizon: Duration,
}

impl YahooEarningsFeed {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        symbols: Vec<String>,
        horizon: Duration,
        timeout: std::time::Duration,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            circuit_breaker,
            symbols,
            horizon,
        })
    }

    fn summary_url(symbol: &str) -> String {
        format!("{QUOTE_SUMMARY_URL}/{symbol}?modules=calendarEvents")
    }

    fn earnings_dates(
        symbol: &str,
        resp: SummaryResponse,
    ) -> Result<Vec<DateTime<Utc>>, DataError> {
        let result = resp
            .quote_summary
            .result
            .ok_or_else(|| match resp.quote_summary.error {
                Some(err) if err.code != "Not Found" => {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
                _ => DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                },
            })?;

        Ok(result
            .into_iter()
            .filter_map(|d| d.calendar_events)
            .filter_map(|c| c.earnings)
            .flat_map(|e| e.earnings_date)
            .filter_map(|ts| DateTime::from_timestamp(ts.raw, 0))
            .collect())
    }

    fn fetch_symbol(&self, symbol: &str) -> Result<Vec<DateTime<Utc>>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let resp = self
            .client
            .get(Self::summary_url(symbol))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    DataError::Timeout(e.without_url().to_string())
                } else {
                    DataError::NetworkUnreachable(e.without_url().to_string())
                }
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }
        // A delisted or mistyped symbol says nothing about the provider's health.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(DataError::Other(format!("HTTP {status} for {symbol} calendar")));
        }

        let summary: SummaryResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse calendar for {symbol}: {e}"))
        })?;
        self.circuit_breaker.record_success();
        Self::earnings_dates(symbol, summary)
    }
}

impl EarningsFeed for YahooEarningsFeed {
    fn name(&self) -> &str {
        "yahoo_calendar"
    }

    fn fetch_upcoming(&self, now: DateTime<Utc>) -> Result<BTreeSet<String>, DataError> {
        collect_upcoming(&self.symbols, now, self.horizon, |symbol| {
            self.fetch_symbol(symbol)
        })
    }
}

/// Symbols with an earnings date inside the horizon, asking `dates_for` once
/// per symbol. `SymbolNotFound` skips the symbol; any other error aborts.
fn collect_upcoming<F>(
    symbols: &[String],
    now: DateTime<Utc>,
    horizon: Duration,
    mut dates_for: F,
) -> Result<BTreeSet<String>, DataError>
where
    F: FnMut(&str) -> Result<Vec<DateTime<Utc>>, DataError>,
{
    let mut upcoming = BTreeSet::new();
    for symbol in symbols {
        let dates = match dates_for(symbol) {
            Ok(dates) => dates,
            Err(DataError::SymbolNotFound { .. }) => {
                tracing::debug!(symbol = %symbol, "no earnings calendar, skipping");
                continue;
            }
            Err(e) => return Err(e),
        };
        if dates.iter().any(|d| is_within_horizon(*d, now, horizon)) {
            upcoming.insert(symbol.clone());
        }
    }
    Ok(upcoming)
}

/// Whether an earnings timestamp falls in `[now - 24h, now + horizon]`.
///
/// Yahoo reports earnings dates at midnight UTC, so a report later today
/// is still in range after the market opens.
fn is_within_horizon(date: DateTime<Utc>, now: DateTime<Utc>, horizon: Duration) -> bool {
    let day_start = now - Duration::hours(24);
    date >= day_start && date <= now + horizon
}

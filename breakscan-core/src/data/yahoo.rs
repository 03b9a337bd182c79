//! Yahoo Finance intraday bar provider.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API using `range` + `interval`
//! queries (`range=5d&interval=15m`). Handles rate limiting, retries with
//! exponential backoff, response parsing, and the circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; every parse failure surfaces as `DataError::ResponseFormatChanged`.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{BarProvider, DataError};
use crate::domain::{Bar, Interval, Period};
use chrono::DateTime;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Tuning knobs for the HTTP client.
#[derive(Debug, Clone)]
pub struct YahooOptions {
    /// Per-request timeout. A cache lookup never blocks longer than
    /// `timeout * (max_retries + 1)` plus backoff.
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for YahooOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 1,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Yahoo Finance bar provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    options: YahooOptions,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        options: YahooOptions,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            options,
        })
    }

    fn chart_url(symbol: &str, interval: Interval, period: Period) -> String {
        format!(
            "{CHART_BASE_URL}/{symbol}?range={}&interval={}&includePrePost=false",
            period.as_query(),
            interval.as_query()
        )
    }

    /// Parse the chart API response into bars.
    ///
    /// Rows where every field is null (halts, holidays) are skipped, as are
    /// rows without a close (the in-progress bar Yahoo sometimes appends).
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // Yahoo omits `timestamp` entirely for symbols with no bars in range.
        let timestamps = data.timestamp.unwrap_or_default();

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let timestamp = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
            })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            let Some(close) = close else {
                continue;
            };

            bars.push(Bar {
                timestamp,
                open: open.unwrap_or(close),
                high: high.unwrap_or(close),
                low: low.unwrap_or(close),
                close,
                volume: volume.unwrap_or(0),
            });
        }

        Ok(bars)
    }

    /// One request against the chart endpoint, with the breaker updated
    /// from the outcome.
    fn attempt(&self, symbol: &str, url: &str) -> Attempt {
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(e) => {
                let timed_out = e.is_timeout();
                let transient = timed_out || e.is_connect();
                let message = e.without_url().to_string();
                if !transient {
                    return Attempt::Fail(DataError::NetworkUnreachable(message));
                }
                self.circuit_breaker.record_failure();
                return Attempt::Retry(if timed_out {
                    DataError::Timeout(message)
                } else {
                    DataError::NetworkUnreachable(message)
                });
            }
        };

        match resp.status() {
            reqwest::StatusCode::FORBIDDEN => {
                // Yahoo answers 403 when it has blocked the client outright.
                self.circuit_breaker.trip();
                Attempt::Fail(DataError::CircuitBreakerTripped)
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                self.circuit_breaker.record_failure();
                let retry_after_secs = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Attempt::Retry(DataError::RateLimited { retry_after_secs })
            }
            reqwest::StatusCode::NOT_FOUND => Attempt::Fail(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
            status if !status.is_success() => {
                self.circuit_breaker.record_failure();
                Attempt::Retry(DataError::Other(format!("{symbol}: HTTP {status}")))
            }
            _ => {
                let parsed = resp
                    .json::<ChartResponse>()
                    .map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "{symbol}: undecodable chart body: {e}"
                        ))
                    })
                    .and_then(|chart| Self::parse_response(symbol, chart));
                match parsed {
                    Ok(bars) => {
                        self.circuit_breaker.record_success();
                        Attempt::Done(bars)
                    }
                    Err(e) => Attempt::Fail(e),
                }
            }
        }
    }

    /// Retry transient failures with exponential backoff. The breaker is
    /// consulted before every attempt, so an open breaker short-circuits
    /// the remaining retries.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<Vec<Bar>, DataError> {
        let url = Self::chart_url(symbol, interval, period);
        let mut pending = DataError::Other(format!("{symbol}: no attempt made"));

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let backoff = self.options.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(
                    symbol,
                    attempt,
                    ?backoff,
                    error = %pending,
                    "retrying chart request"
                );
                std::thread::sleep(backoff);
            }
            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }
            match self.attempt(symbol, &url) {
                Attempt::Done(bars) => return Ok(bars),
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) => pending = e,
            }
        }

        Err(pending)
    }
}

enum Attempt {
    Done(Vec<Bar>),
    Retry(DataError),
    Fail(DataError),
}

impl BarProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<Vec<Bar>, DataError> {
        let bars = self.fetch_with_retry(symbol, interval, period)?;
        if bars.is_empty() {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
                interval,
                period,
            });
        }
        tracing::debug!(symbol, %interval, %period, bars = bars.len(), "fetched bars");
        Ok(bars)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<Bar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("AAPL", resp)
    }

    #[test]
    fn chart_url_uses_range_and_interval() {
        let url = YahooProvider::chart_url("AAPL", Interval::FifteenMinute, Period::days(5));
        assert!(url.ends_with("/AAPL?range=5d&interval=15m&includePrePost=false"));
    }

    #[test]
    fn parses_rows_and_skips_missing_close() {
        let bars = parse(
            r#"{"chart":{"result":[{"timestamp":[1709562600,1709563500,1709564400],
            "indicators":{"quote":[{"open":[100.0,101.0,null],"high":[102.0,103.0,null],
            "low":[99.0,100.5,null],"close":[101.0,102.5,null],"volume":[1000,null,null]}]}}],
            "error":null}}"#,
        )
        .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 101.0);
        assert_eq!(bars[1].volume, 0);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn not_found_maps_to_symbol_not_found() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn missing_timestamps_yield_no_bars() {
        let bars = parse(
            r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#,
        )
        .unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn unknown_error_is_format_change() {
        let err = parse(r#"{"chart":{"result":null,"error":{"code":"Bad","description":"x"}}}"#)
            .unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}

//! Notification delivery and message formatting.
//!
//! Delivery is best-effort: a failed send is logged by the caller and never
//! retried or rolled back.

use crate::config::TelegramCredentials;
use breakscan_core::components::ScoreBreakdown;
use breakscan_core::domain::{Candidate, MarketRegime, Mode, Side};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("telegram rejected message: HTTP {status}: {description}")]
    Rejected { status: u16, description: String },
}

/// Delivers formatted text to a channel.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, text: &str) -> Result<(), NotifyError>;
}

// ── Telegram ─────────────────────────────────────────────────────────

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    credentials: TelegramCredentials,
}

impl TelegramNotifier {
    pub fn new(credentials: TelegramCredentials, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            client,
            credentials,
        })
    }

    fn send_url(&self) -> String {
        format!("{TELEGRAM_API}/bot{}/sendMessage", self.credentials.bot_token)
    }
}

impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    fn send(&self, text: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: &self.credentials.chat_id,
            text,
            disable_web_page_preview: true,
        };
        let resp = self
            .client
            .post(self.send_url())
            .json(&body)
            .send()
            // The URL embeds the bot token; keep it out of the error text.
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

        let status = resp.status();
        let reply: Option<TelegramReply> = resp.json().ok();
        match reply {
            Some(TelegramReply { ok: true, .. }) if status.is_success() => Ok(()),
            other => Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}

// ── Log-only ─────────────────────────────────────────────────────────

/// Writes messages to the log and keeps them in memory. Used for dry runs,
/// `scan-once`, and tests.
#[derive(Debug, Default)]
pub struct LogNotifier {
    sent: Mutex<Vec<String>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(notifier = "log", "{text}");
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }
}

// ── Formatting ───────────────────────────────────────────────────────

/// One signal: side, symbol, price vs. level, score breakdown, context.
pub fn format_signal(
    candidate: &Candidate,
    breakdown: &ScoreBreakdown,
    regime: MarketRegime,
    mode: Mode,
) -> String {
    let (arrow, relation) = match candidate.side {
        Side::Long => ("🟢", "above base high"),
        Side::Short => ("🔴", "below base low"),
    };
    format!(
        "{arrow} {side} {symbol} @ {price:.2}\n\
         Broke {relation} {level:.2}\n\
         Score {total}/100 (rvol {rv}, squeeze {sq}, strength {st}, timing {tm})\n\
         Market {regime} | Mode {mode}",
        side = candidate.side,
        symbol = candidate.symbol,
        price = candidate.price,
        level = candidate.level,
        total = breakdown.total,
        rv = breakdown.relative_volume,
        sq = breakdown.squeeze,
        st = breakdown.strength,
        tm = breakdown.timing,
    )
}

pub fn format_startup(mode: Mode, universe_size: usize, fingerprint: &str) -> String {
    format!(
        "🚀 Breakout scanner started\nMode {mode} | {universe_size} symbols | config {fingerprint}"
    )
}

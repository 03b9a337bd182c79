//! Scanner configuration loaded from TOML.
//!
//! Every section and field carries a serde default, so an empty file is a
//! valid configuration. Secrets never live in the file: Telegram credentials
//! come from the environment only.

use breakscan_core::components::{MinScoreGate, TimingPolicy, DEFAULT_PRICE_FLOOR};
use breakscan_core::data::{Universe, UniverseError};
use breakscan_core::domain::{Mode, SeriesRequest};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";

const TIME_FORMAT: &str = "%H:%M";

/// Errors from loading or validating a scanner configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),

    #[error("unknown time zone '{0}'")]
    UnknownTimezone(String),

    #[error("invalid time '{value}' for {field}, expected HH:MM")]
    InvalidTime { field: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("universe: {0}")]
    Universe(#[from] UniverseError),

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}

/// Top-level configuration for one scanner process.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub scanner: ScannerSection,
    pub session: SessionConfig,
    pub scoring: ScoringConfig,
    pub data: DataConfig,
    pub cadence: CadenceConfig,
    pub earnings: EarningsConfig,
    pub universe: Universe,
    /// Separate universe file; replaces `[universe]` when set. Relative
    /// paths resolve against the config file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universe_file: Option<PathBuf>,
}

/// Mode, caps, and cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSection {
    pub mode: Mode,
    pub max_signals_per_day: u32,
    pub cooldown_minutes: u32,
    /// Signals dispatched per tick. Unset means every qualifying candidate
    /// up to the remaining daily capacity.
    pub top_n: Option<usize>,
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            mode: Mode::Safe,
            max_signals_per_day: 3,
            cooldown_minutes: 90,
            top_n: Some(3),
        }
    }
}

/// Trading window in the exchange's local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timezone: String,
    /// Inclusive start, `HH:MM`.
    pub start: String,
    /// Exclusive end, `HH:MM`.
    pub end: String,
    pub opening_range_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            start: "09:30".to_string(),
            end: "16:00".to_string(),
            opening_range_minutes: 30,
        }
    }
}

impl SessionConfig {
    pub fn parse_timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn parse_start(&self) -> Result<NaiveTime, ConfigError> {
        parse_time("session.start", &self.start)
    }

    pub fn parse_end(&self) -> Result<NaiveTime, ConfigError> {
        parse_time("session.end", &self.end)
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|_| ConfigError::InvalidTime {
        field,
        value: value.to_string(),
    })
}

/// Score timing component and minimum-score gate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub timing: TimingPolicy,
    pub gate: MinScoreGate,
}

/// Bar cache, indicators, and the Yahoo client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub cache_ttl_minutes: u32,
    pub failure_backoff_secs: u32,
    pub momentum_lookback: usize,
    pub bias_indices: Vec<String>,
    pub price_floor: f64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: 20,
            failure_backoff_secs: 60,
            momentum_lookback: 4,
            bias_indices: vec!["SPY".to_string(), "QQQ".to_string()],
            price_floor: DEFAULT_PRICE_FLOOR,
            request_timeout_secs: 15,
            max_retries: 1,
        }
    }
}

/// Control-loop delays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub scan_minutes: u32,
    /// Outside trading hours or at the daily cap.
    pub idle_minutes: u32,
    /// After a tick-level error.
    pub error_backoff_secs: u32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            scan_minutes: 15,
            idle_minutes: 5,
            error_backoff_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningsSource {
    /// Yahoo quoteSummary calendar events for every universe symbol.
    #[default]
    Yahoo,
    /// The `symbols` list below, as written.
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarningsConfig {
    pub enabled: bool,
    pub source: EarningsSource,
    pub refresh_hours: u32,
    pub retry_minutes: u32,
    pub horizon_days: u32,
    pub symbols: Vec<String>,
}

impl Default for EarningsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: EarningsSource::Yahoo,
            refresh_hours: 24,
            retry_minutes: 60,
            horizon_days: 2,
            symbols: Vec::new(),
        }
    }
}

impl ScannerConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;

        if let Some(file) = config.universe_file.take() {
            let resolved = match path.parent() {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file,
            };
            config.universe = Universe::from_file(&resolved)?;
            config.universe_file = Some(resolved);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string. Does not validate and does not read `universe_file`.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The built-in configuration rendered as TOML.
    pub fn default_toml() -> Result<String, ConfigError> {
        Self::default().to_toml()
    }

    /// BLAKE3 over the canonical JSON form. Two processes with the same
    /// fingerprint evaluate candidates identically.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex()[..16].to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scanner;
        if s.max_signals_per_day == 0 {
            return Err(invalid("scanner.max_signals_per_day must be at least 1"));
        }
        if s.top_n == Some(0) {
            return Err(invalid("scanner.top_n must be at least 1 when set"));
        }

        let session = &self.session;
        session.parse_timezone()?;
        let start = session.parse_start()?;
        let end = session.parse_end()?;
        if start >= end {
            return Err(invalid(format!(
                "session.start {} must be before session.end {}",
                session.start, session.end
            )));
        }
        let window_minutes = (end - start).num_minutes();
        if i64::from(session.opening_range_minutes) > window_minutes {
            return Err(invalid(format!(
                "session.opening_range_minutes {} exceeds the {window_minutes}-minute session",
                session.opening_range_minutes
            )));
        }

        let gate_max = match self.scoring.gate {
            MinScoreGate::Flat { min_score } => min_score,
            MinScoreGate::SessionAware {
                opening_range,
                regular,
            } => opening_range.max(regular),
        };
        if gate_max > 100 {
            return Err(invalid("scoring.gate thresholds must be within 0..=100"));
        }

        let d = &self.data;
        if d.cache_ttl_minutes == 0 {
            return Err(invalid("data.cache_ttl_minutes must be at least 1"));
        }
        let shortest = SeriesRequest::INDEX_BIAS
            .min_bars
            .min(SeriesRequest::TREND.min_bars);
        if d.momentum_lookback == 0 || d.momentum_lookback >= shortest {
            return Err(invalid(format!(
                "data.momentum_lookback must be in 1..{shortest}, got {}",
                d.momentum_lookback
            )));
        }
        if d.bias_indices.len() != 2 || d.bias_indices.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("data.bias_indices must name exactly two symbols"));
        }
        if !d.price_floor.is_finite() || d.price_floor < 0.0 {
            return Err(invalid("data.price_floor must be a non-negative number"));
        }
        if d.request_timeout_secs == 0 {
            return Err(invalid("data.request_timeout_secs must be at least 1"));
        }

        if self.cadence.scan_minutes == 0 {
            return Err(invalid("cadence.scan_minutes must be at least 1"));
        }

        let e = &self.earnings;
        if e.enabled && e.refresh_hours == 0 {
            return Err(invalid("earnings.refresh_hours must be at least 1"));
        }

        self.universe.validate()?;
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

/// Telegram bot credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramCredentials {
    /// Read `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup`; blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingEnv(name))
        };
        Ok(Self {
            bot_token: read(BOT_TOKEN_VAR)?,
            chat_id: read(CHAT_ID_VAR)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = ScannerConfig::from_toml("").unwrap();
        assert_eq!(config, ScannerConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn default_toml_round_trips() {
        let text = ScannerConfig::default_toml().unwrap();
        let parsed = ScannerConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, ScannerConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ScannerConfig::from_toml(
            r#"
[scanner]
mode = "aggressive"
cooldown_minutes = 45

[scoring.gate]
policy = "session_aware"
opening_range = 55
regular = 60
"#,
        )
        .unwrap();
        assert_eq!(config.scanner.mode, Mode::Aggressive);
        assert_eq!(config.scanner.cooldown_minutes, 45);
        assert_eq!(config.scanner.max_signals_per_day, 3);
        assert_eq!(config.scoring.gate, MinScoreGate::session_aware_default());
        assert_eq!(config.scoring.timing, TimingPolicy::Flat);
        assert_eq!(config.data.momentum_lookback, 4);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = ScannerConfig::default();
        let mut b = ScannerConfig::default();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.scanner.cooldown_minutes = 30;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 16);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let mut config = ScannerConfig::default();
        config.session.timezone = "Mars/Olympus".into();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownTimezone(_))));
    }

    #[test]
    fn rejects_inverted_session() {
        let mut config = ScannerConfig::default();
        config.session.start = "16:00".into();
        config.session.end = "09:30".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.session.start = "9h30".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTime { .. })));
    }

    #[test]
    fn rejects_lookback_beyond_min_bars() {
        let mut config = ScannerConfig::default();
        config.data.momentum_lookback = 5;
        config.validate().unwrap();
        config.data.momentum_lookback = 6;
        assert!(config.validate().is_err());
        config.data.momentum_lookback = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_cap_and_zero_top_n() {
        let mut config = ScannerConfig::default();
        config.scanner.max_signals_per_day = 0;
        assert!(config.validate().is_err());

        let mut config = ScannerConfig::default();
        config.scanner.top_n = Some(0);
        assert!(config.validate().is_err());
        config.scanner.top_n = None;
        config.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_gate() {
        let mut config = ScannerConfig::default();
        config.scoring.gate = MinScoreGate::Flat { min_score: 101 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_require_both_variables() {
        let creds = TelegramCredentials::from_lookup(|name| match name {
            BOT_TOKEN_VAR => Some("123:abc".into()),
            CHAT_ID_VAR => Some(" 42 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(creds.chat_id, "42");
        assert!(!format!("{creds:?}").contains("123:abc"));

        let missing = TelegramCredentials::from_lookup(|name| match name {
            BOT_TOKEN_VAR => Some("123:abc".into()),
            _ => Some("   ".into()),
        });
        assert!(matches!(missing, Err(ConfigError::MissingEnv(CHAT_ID_VAR))));
    }
}

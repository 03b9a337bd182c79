//! Trading session: the exchange-local window in which ticks scan.

use crate::config::{ConfigError, SessionConfig};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// Weekday trading window `[open, close)` in a fixed time zone, with an
/// opening range of `opening_range` after the open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingSession {
    tz: Tz,
    open: NaiveTime,
    close: NaiveTime,
    opening_range: Duration,
}

impl TradingSession {
    pub fn new(tz: Tz, open: NaiveTime, close: NaiveTime, opening_range: Duration) -> Self {
        Self {
            tz,
            open,
            close,
            opening_range,
        }
    }

    /// 09:30–16:00 America/New_York with a 30-minute opening range.
    pub fn us_equities() -> Self {
        Self::new(
            chrono_tz::America::New_York,
            NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            Duration::minutes(30),
        )
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.parse_timezone()?,
            config.parse_start()?,
            config.parse_end()?,
            Duration::minutes(i64::from(config.opening_range_minutes)),
        ))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn local(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.tz)
    }

    /// Calendar date in the trading time zone. Drives the daily-cap reset.
    pub fn trading_day(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date_naive()
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = self.local(now);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let t = local.time();
        t >= self.open && t < self.close
    }

    pub fn in_opening_range(&self, now: DateTime<Utc>) -> bool {
        self.is_open(now) && self.local(now).time() < self.open + self.opening_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn window_is_half_open_in_new_york() {
        let s = TradingSession::us_equities();
        // 2024-03-05 is a Tuesday, EST (UTC-5).
        assert!(!s.is_open(utc(2024, 3, 5, 14, 29)));
        assert!(s.is_open(utc(2024, 3, 5, 14, 30)));
        assert!(s.is_open(utc(2024, 3, 5, 20, 59)));
        assert!(!s.is_open(utc(2024, 3, 5, 21, 0)));
    }

    #[test]
    fn follows_daylight_saving() {
        let s = TradingSession::us_equities();
        // 2024-03-12 is after the DST switch, EDT (UTC-4).
        assert!(s.is_open(utc(2024, 3, 12, 13, 30)));
        assert!(!s.is_open(utc(2024, 3, 12, 20, 0)));
    }

    #[test]
    fn weekends_are_closed() {
        let s = TradingSession::us_equities();
        assert!(!s.is_open(utc(2024, 3, 9, 16, 0)));
        assert!(!s.is_open(utc(2024, 3, 10, 16, 0)));
    }

    #[test]
    fn opening_range_is_first_thirty_minutes() {
        let s = TradingSession::us_equities();
        assert!(s.in_opening_range(utc(2024, 3, 5, 14, 30)));
        assert!(s.in_opening_range(utc(2024, 3, 5, 14, 59)));
        assert!(!s.in_opening_range(utc(2024, 3, 5, 15, 0)));
        assert!(!s.in_opening_range(utc(2024, 3, 5, 14, 0)));
    }

    #[test]
    fn trading_day_uses_local_date() {
        let s = TradingSession::us_equities();
        // 02:00 UTC on the 6th is still the 5th in New York.
        assert_eq!(
            s.trading_day(utc(2024, 3, 6, 2, 0)),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }

    #[test]
    fn builds_from_config() {
        let mut config = SessionConfig::default();
        config.timezone = "Europe/London".into();
        config.start = "08:00".into();
        config.end = "16:30".into();
        let s = TradingSession::from_config(&config).unwrap();
        assert_eq!(s.timezone(), chrono_tz::Europe::London);
        assert!(s.is_open(utc(2024, 1, 8, 8, 0)));
    }
}

//! Config file loading: TOML on disk, universe files, validation errors.

use std::fs;

use breakscan_core::components::{MinScoreGate, TimingPolicy};
use breakscan_core::domain::Mode;
use breakscan_runner::{ConfigError, EarningsSource, ScannerConfig};

#[test]
fn loads_full_config_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scanner.toml");
    fs::write(
        &path,
        r#"
[scanner]
mode = "aggressive"
max_signals_per_day = 5
cooldown_minutes = 60
top_n = 2

[session]
timezone = "America/Chicago"
start = "08:30"
end = "15:00"
opening_range_minutes = 15

[scoring]
timing = "opening_range"

[scoring.gate]
policy = "session_aware"
opening_range = 55
regular = 60

[data]
momentum_lookback = 3
bias_indices = ["SPY", "IWM"]

[earnings]
source = "static"
symbols = ["AAPL"]

[universe.sectors]
tech = ["AAPL", "MSFT"]
energy = ["XOM"]
"#,
    )
    .unwrap();

    let config = ScannerConfig::from_file(&path).unwrap();
    assert_eq!(config.scanner.mode, Mode::Aggressive);
    assert_eq!(config.scanner.top_n, Some(2));
    assert_eq!(config.session.timezone, "America/Chicago");
    assert_eq!(config.scoring.timing, TimingPolicy::OpeningRange);
    assert_eq!(config.scoring.gate, MinScoreGate::session_aware_default());
    assert_eq!(config.data.momentum_lookback, 3);
    assert_eq!(config.data.cache_ttl_minutes, 20);
    assert_eq!(config.earnings.source, EarningsSource::Static);
    assert_eq!(config.universe.tickers(), vec!["XOM", "AAPL", "MSFT"]);
}

#[test]
fn universe_file_resolves_relative_to_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("universe.toml"),
        "[sectors]\nfinance = [\"jpm\", \"GS\"]\n",
    )
    .unwrap();
    let path = dir.path().join("scanner.toml");
    fs::write(&path, "universe_file = \"universe.toml\"\n").unwrap();

    let config = ScannerConfig::from_file(&path).unwrap();
    assert_eq!(config.universe.tickers(), vec!["JPM", "GS"]);
    assert_eq!(config.universe_file, Some(dir.path().join("universe.toml")));
}

#[test]
fn invalid_values_are_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scanner.toml");
    fs::write(&path, "[session]\ntimezone = \"Nowhere/Special\"\n").unwrap();

    let err = ScannerConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownTimezone(ref tz) if tz == "Nowhere/Special"));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scanner.toml");
    fs::write(&path, "[scanner\nmode = ").unwrap();
    assert!(matches!(
        ScannerConfig::from_file(&path),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ScannerConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn default_config_written_to_disk_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scanner.toml");
    fs::write(&path, ScannerConfig::default_toml().unwrap()).unwrap();

    let config = ScannerConfig::from_file(&path).unwrap();
    assert_eq!(config, ScannerConfig::default());
    assert_eq!(
        config.fingerprint().unwrap(),
        ScannerConfig::default().fingerprint().unwrap()
    );
}

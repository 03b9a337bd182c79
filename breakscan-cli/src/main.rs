//! Breakscan CLI: run the intraday breakout scanner.
//!
//! Commands:
//! - `run`: the scanner control loop (Telegram, or log-only with `--dry-run`)
//! - `scan-once`: a single tick with the log notifier, report printed
//! - `universe`: list the resolved ticker universe
//! - `init-config`: print the default configuration as TOML

use anyhow::{bail, Context, Result};
use breakscan_core::data::{
    BarProvider, CircuitBreaker, EarningsFeed, StaticEarningsFeed, SyntheticProvider,
    YahooEarningsFeed, YahooOptions, YahooProvider,
};
use breakscan_runner::{
    guarded_tick, run_loop, Cadence, EarningsSource, LogNotifier, Notifier, Scanner,
    ScannerConfig, SystemClock, TelegramCredentials, TelegramNotifier, TickOutcome,
};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "breakscan",
    about = "Breakscan: intraday breakout scanner with ranked trade-idea notifications"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scanner loop.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Log signals instead of sending them to Telegram.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Use generated bars instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Stop after this many ticks.
        #[arg(long)]
        max_ticks: Option<u64>,
    },
    /// Run a single tick and print the report.
    ScanOnce {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Evaluate as of this instant (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Use generated bars instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// List the ticker universe by sector.
    Universe {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Print the default configuration.
    InitConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            dry_run,
            synthetic,
            max_ticks,
        } => run_scanner(&config, dry_run, synthetic, max_ticks),
        Commands::ScanOnce {
            config,
            at,
            synthetic,
        } => run_scan_once(&config, at.as_deref(), synthetic),
        Commands::Universe { config } => run_universe(&config),
        Commands::InitConfig => {
            print!("{}", ScannerConfig::default_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<ScannerConfig> {
    ScannerConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

/// Bar provider plus the circuit breaker shared with the earnings feed.
fn build_provider(
    config: &ScannerConfig,
    synthetic: bool,
    anchor: DateTime<Utc>,
) -> Result<(Arc<dyn BarProvider>, Option<Arc<CircuitBreaker>>)> {
    if synthetic {
        tracing::info!(%anchor, "using synthetic bars");
        return Ok((Arc::new(SyntheticProvider::random_walk(anchor)), None));
    }
    let breaker = Arc::new(CircuitBreaker::default_provider());
    let options = YahooOptions {
        timeout: std::time::Duration::from_secs(config.data.request_timeout_secs),
        max_retries: config.data.max_retries,
        ..YahooOptions::default()
    };
    let provider = YahooProvider::new(Arc::clone(&breaker), options)?;
    Ok((Arc::new(provider), Some(breaker)))
}

fn build_earnings_feed(
    config: &ScannerConfig,
    breaker: Option<Arc<CircuitBreaker>>,
) -> Result<Option<Arc<dyn EarningsFeed>>> {
    let earnings = &config.earnings;
    if !earnings.enabled {
        return Ok(None);
    }
    match (earnings.source, breaker) {
        (EarningsSource::Static, _) => {
            Ok(Some(Arc::new(StaticEarningsFeed::new(&earnings.symbols))))
        }
        (EarningsSource::Yahoo, Some(breaker)) => {
            let feed = YahooEarningsFeed::new(
                breaker,
                config.universe.tickers(),
                Duration::days(i64::from(earnings.horizon_days)),
                std::time::Duration::from_secs(config.data.request_timeout_secs),
            )?;
            Ok(Some(Arc::new(feed)))
        }
        (EarningsSource::Yahoo, None) => {
            tracing::info!("synthetic data: Yahoo earnings feed disabled");
            Ok(None)
        }
    }
}

fn build_scanner(
    config: &ScannerConfig,
    synthetic: bool,
    anchor: DateTime<Utc>,
    notifier: Arc<dyn Notifier>,
) -> Result<Scanner> {
    let (provider, breaker) = build_provider(config, synthetic, anchor)?;
    let feed = build_earnings_feed(config, breaker)?;
    let mut scanner = Scanner::new(config, &config.universe, provider, notifier)?;
    if let Some(feed) = feed {
        scanner = scanner.with_earnings_feed(feed);
    }
    Ok(scanner)
}

fn run_scanner(
    config_path: &Path,
    dry_run: bool,
    synthetic: bool,
    max_ticks: Option<u64>,
) -> Result<()> {
    if max_ticks == Some(0) {
        bail!("--max-ticks must be at least 1");
    }
    let config = load_config(config_path)?;
    let fingerprint = config.fingerprint()?;

    let notifier: Arc<dyn Notifier> = if dry_run {
        Arc::new(LogNotifier::new())
    } else {
        let credentials = TelegramCredentials::from_env()?;
        Arc::new(TelegramNotifier::new(
            credentials,
            std::time::Duration::from_secs(config.data.request_timeout_secs),
        )?)
    };

    let mut scanner = build_scanner(&config, synthetic, Utc::now(), notifier)?;
    tracing::info!(
        mode = %scanner.mode(),
        universe = scanner.universe().len(),
        fingerprint = %fingerprint,
        dry_run,
        synthetic,
        "scanner starting"
    );
    if let Err(e) = scanner.notify_startup(&fingerprint) {
        tracing::warn!(error = %e, "start-up notification failed");
    }

    let cadence = Cadence::from_config(&config.cadence);
    let summary = run_loop(&mut scanner, &SystemClock, &cadence, max_ticks);
    println!(
        "Ran {} ticks: {} scanned, {} idle, {} errors, {} signals",
        summary.ticks, summary.scanned, summary.idle, summary.errors, summary.dispatched
    );
    Ok(())
}

fn run_scan_once(config_path: &Path, at: Option<&str>, synthetic: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let now = match at {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("--at '{s}' is not an RFC 3339 timestamp"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let notifier = Arc::new(LogNotifier::new());
    let mut scanner = build_scanner(&config, synthetic, now, notifier.clone())?;

    match guarded_tick(&mut scanner, now)? {
        TickOutcome::OutsideHours => println!("{now}: outside trading hours, nothing scanned"),
        TickOutcome::DailyCapReached => println!("{now}: daily signal cap reached"),
        TickOutcome::Scanned(report) => {
            println!("{report}");
            for message in notifier.messages() {
                println!();
                println!("{message}");
            }
        }
    }
    Ok(())
}

fn run_universe(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let universe = &config.universe;

    for sector in universe.sector_names() {
        let tickers = universe.sector_tickers(sector).unwrap_or_default();
        println!("{:<20} {}", sector, tickers.join(" "));
    }
    println!();
    println!(
        "{} unique tickers across {} sectors",
        universe.ticker_count(),
        universe.sector_names().len()
    );
    Ok(())
}

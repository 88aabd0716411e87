//! Furlong main entry point
//!
//! This is the command-line interface for the Furlong race-result crawler.

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use furlong::config::{load_config_with_hash, validate, Config, StorageBackend};
use furlong::crawler::{crawl, StopSignal};
use furlong::output::{export_json, load_statistics, print_statistics};
use furlong::race::DateKey;
use furlong::storage::open_store;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Furlong: an incremental race-result crawler
///
/// Furlong walks the race listings of the last N days, fetches the result
/// table of every race it has not saved yet, and stores one unit per race.
/// Re-running is always safe: saved races are skipped.
#[derive(Parser, Debug)]
#[command(name = "furlong")]
#[command(version)]
#[command(about = "An incremental race-result crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Number of days to crawl backward from today (overrides the config)
    #[arg(long)]
    days: Option<u32>,

    /// Delay before each race fetch in milliseconds (overrides the config)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show which dates would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export"])]
    dry_run: bool,

    /// Show statistics of the persisted store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export"])]
    stats: bool,

    /// Write every saved participant row, tagged with its race id, to a JSON file and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats"])]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(days) = cli.days {
        config.crawler.days = days;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.crawler.delay_ms = delay_ms;
    }
    validate(&config).context("Invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = &cli.export {
        handle_export(&config, path)?;
    } else {
        handle_crawl(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("furlong=info,warn"),
            1 => EnvFilter::new("furlong=debug,info"),
            2 => EnvFilter::new("furlong=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective config and date range
fn handle_dry_run(config: &Config) {
    println!("=== Furlong Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Days: {}", config.crawler.days);
    println!("  Delay between fetches: {}ms", config.crawler.delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Connect timeout: {}s", config.crawler.connect_timeout_secs);

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  Default encoding: {}", config.source.encoding);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    match config.output.backend {
        StorageBackend::Json => println!("  JSON directory: {}", config.output.data_dir.display()),
        StorageBackend::Sqlite => {
            println!("  SQLite database: {}", config.output.database_path.display())
        }
    }

    let today = Local::now().date_naive();
    let newest = DateKey::days_before(today, 0);
    let oldest = DateKey::days_before(today, config.crawler.days.saturating_sub(1));

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl listings from {} back to {}", newest, oldest);
}

/// Handles the --stats mode: shows statistics of the persisted store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.output).context("Failed to open store")?;
    let stats = load_statistics(store.as_ref())?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the --export mode: writes the flattened records
fn handle_export(config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    let store = open_store(&config.output).context("Failed to open store")?;
    let rows = export_json(store.as_ref(), path)?;
    println!("✓ Exported {} rows to: {}", rows, path.display());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let stop = StopSignal::new();

    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current race");
            ctrl_c_stop.stop();
        }
    });

    match crawl(config, stop).await {
        Ok(report) => {
            if report.persist_failures() > 0 {
                tracing::error!(
                    "{} races could not be saved and will be retried on the next run",
                    report.persist_failures()
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

//! # Seven Shows Monitor
//!
//! Watches The Guardian's weekly "seven best shows to stream this week"
//! series for a new article, archives the recommended shows, and posts a
//! formatted notification to a Discord webhook.
//!
//! ## Usage
//!
//! ```sh
//! # One scheduled run; exit code 0 covers both "recorded" and "no change"
//! seven_shows_monitor --config config.toml
//!
//! # Operator tooling
//! seven_shows_monitor status
//! seven_shows_monitor search "slow horses" --limit 5
//! seven_shows_monitor test
//! ```
//!
//! ## Architecture
//!
//! Each invocation is one pass through the pipeline:
//! 1. **Fetching**: download the series index page
//! 2. **Parsing**: extract article summaries, newest first
//! 3. **Detecting**: compare the newest article id against the processed ledger
//! 4. **Recording + Notifying**: archive the shows and announce them, or skip
//!
//! Runs are idempotent: cron fires several times around the expected publish
//! window and only the first sighting of a new article has side effects.

use clap::Parser;
use std::error::Error;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod detector;
mod error;
mod fetcher;
mod models;
mod monitor;
mod notifier;
mod parser;
mod storage;
mod utils;

use cli::{Cli, Command};
use config::Config;
use monitor::{Monitor, RunStatus};
use storage::QueryFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();

    let args = Cli::parse();
    debug!(?args.config, ?args.data_dir, "Parsed CLI arguments");

    let mut config = Config::load(&args.config)?;
    if let Some(url) = args.webhook_url {
        config.webhook_url = Some(url);
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    config.validate()?;

    match args.command {
        Some(Command::Config) => {
            println!("{config}");
        }
        Some(Command::Status) => {
            let monitor = Monitor::new(config)?;
            println!("{}", monitor.status()?);
        }
        Some(Command::Search {
            query,
            platform,
            limit,
        }) => {
            let monitor = Monitor::new(config)?;
            let matches = monitor.search(&QueryFilter {
                text: query,
                platform,
                limit: Some(limit),
            })?;
            if matches.is_empty() {
                println!("No matching shows in the archive.");
            }
            for m in &matches {
                println!(
                    "{} [{}] — {} ({})",
                    m.show.title, m.show.platform, m.article_title, m.article_date
                );
            }
        }
        Some(Command::Test) => {
            info!("testing components; nothing will be persisted");
            let monitor = Monitor::new(config)?;
            monitor.test_components().await?;
            info!("all component tests passed");
        }
        None => {
            info!("seven_shows_monitor starting a scheduled run");
            let monitor = Monitor::new(config)?;
            match monitor.run_once().await? {
                RunStatus::Recorded {
                    article_id,
                    show_count,
                } => {
                    info!(%article_id, shows = show_count, "new shows recorded and announced");
                }
                RunStatus::NoChange { article_id } => {
                    info!(%article_id, "no new article this run");
                }
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, "Execution complete");
    Ok(())
}

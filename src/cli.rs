//! Command-line interface definitions for the seven shows monitor.
//!
//! The default invocation performs one check-and-notify run; subcommands
//! exist for operator inspection and for exercising components without
//! touching persisted state.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the seven shows monitor.
///
/// # Examples
///
/// ```sh
/// # One scheduled run (the cron entry point)
/// seven_shows_monitor --config /etc/seven_shows/config.toml
///
/// # Exercise fetch/parse/notify without persisting anything
/// seven_shows_monitor test
///
/// # Inspect the archive
/// seven_shows_monitor search "severance" --limit 5
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Discord webhook URL used for notifications
    #[arg(long, env = "DISCORD_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// Override the data directory from the configuration file
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Exercise fetch, parse, and notify without persisting anything
    Test,
    /// Report the last-checked record and storage statistics
    Status,
    /// Print the effective configuration with secrets redacted
    Config,
    /// Search the archived shows by free text and/or platform
    Search {
        /// Text matched against show title, platform, and description
        query: Option<String>,

        /// Only return shows on this platform
        #[arg(long)]
        platform: Option<String>,

        /// Maximum number of matches to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_invocation_is_a_run() {
        let cli = Cli::parse_from(["seven_shows_monitor"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn test_status_subcommand() {
        let cli = Cli::parse_from(["seven_shows_monitor", "status"]);
        assert!(matches!(cli.command, Some(Command::Status)));
    }

    #[test]
    fn test_search_subcommand_flags() {
        let cli = Cli::parse_from([
            "seven_shows_monitor",
            "search",
            "detective",
            "--platform",
            "Netflix",
            "--limit",
            "5",
        ]);
        match cli.command {
            Some(Command::Search {
                query,
                platform,
                limit,
            }) => {
                assert_eq!(query.as_deref(), Some("detective"));
                assert_eq!(platform.as_deref(), Some("Netflix"));
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_webhook_flag() {
        let cli = Cli::parse_from([
            "seven_shows_monitor",
            "--webhook-url",
            "https://discord.com/api/webhooks/1/x",
            "test",
        ]);
        assert!(cli.webhook_url.is_some());
        assert!(matches!(cli.command, Some(Command::Test)));
    }
}

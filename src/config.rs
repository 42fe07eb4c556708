//! Configuration loading and validation.
//!
//! Settings live in a TOML file; the webhook URL is a secret and normally
//! arrives via the `DISCORD_WEBHOOK_URL` environment variable (see
//! [`crate::cli`]), though it may also be set in the file. Every component
//! receives the configuration at construction rather than reading globals,
//! so components stay testable in isolation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{MonitorError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Index page of the weekly series.
    #[serde(default = "default_series_url")]
    pub series_url: String,

    /// Base URL used to resolve relative article links.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory holding the history, ledger, and last-checked files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum number of article ids kept in the processed-articles ledger.
    /// The archive itself is never bounded.
    #[serde(default = "default_ledger_cap")]
    pub ledger_cap: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// When true, fetch/parse failures also produce a webhook alert so an
    /// operator notices that the monitor needs attention.
    #[serde(default)]
    pub send_error_notifications: bool,

    /// Webhook endpoint for notifications. Treated as a secret: redacted in
    /// all diagnostic output.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_series_url() -> String {
    "https://www.theguardian.com/tv-and-radio/series/the-seven-best-shows-to-stream-this-week"
        .to_string()
}

fn default_base_url() -> String {
    "https://www.theguardian.com".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_ledger_cap() -> usize {
    50
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            series_url: default_series_url(),
            base_url: default_base_url(),
            data_dir: default_data_dir(),
            ledger_cap: default_ledger_cap(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            send_error_notifications: false,
            webhook_url: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| MonitorError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.series_url.starts_with("http") {
            return Err(MonitorError::Config(format!(
                "series_url must be an http(s) URL, got {:?}",
                self.series_url
            )));
        }
        if !self.base_url.starts_with("http") {
            return Err(MonitorError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(MonitorError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.ledger_cap == 0 {
            return Err(MonitorError::Config(
                "ledger_cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn webhook_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}

/// Redacting display used by the `config` subcommand. The webhook URL is
/// never printed.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Seven shows monitor configuration:")?;
        writeln!(f, "  series_url: {}", self.series_url)?;
        writeln!(f, "  base_url: {}", self.base_url)?;
        writeln!(f, "  data_dir: {}", self.data_dir.display())?;
        writeln!(f, "  ledger_cap: {}", self.ledger_cap)?;
        writeln!(f, "  request_timeout_secs: {}", self.request_timeout_secs)?;
        writeln!(f, "  user_agent: {}", self.user_agent)?;
        writeln!(
            f,
            "  send_error_notifications: {}",
            self.send_error_notifications
        )?;
        write!(
            f,
            "  webhook: {}",
            if self.webhook_configured() {
                "configured (redacted)"
            } else {
                "not configured"
            }
        )
    }
}

//! Error taxonomy for the monitor.
//!
//! The variants map directly onto the run's failure classes: fetch and parse
//! errors abort the run before any mutation, storage errors abort it after,
//! and delivery errors are logged without failing the run once the archive
//! has been written.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// Network failure, timeout, or non-2xx response from the source site.
    #[error("fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    /// The page no longer matches the expected structure.
    #[error("page shape changed: {0}")]
    Parse(String),

    /// The webhook endpoint was unreachable or rejected the notification.
    #[error("notification delivery failed: {0}")]
    Delivery(String),

    /// Local persistence I/O failure.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Integrity check in the history store; the change detector should make
    /// this unreachable, but the store enforces it regardless.
    #[error("article {0} is already recorded in the history")]
    DuplicateArticle(String),

    /// Missing or malformed configuration values.
    #[error("configuration: {0}")]
    Config(String),
}

impl MonitorError {
    pub fn fetch(url: &str, err: &reqwest::Error) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

//! HTTP fetching of source pages.
//!
//! One outbound GET per call, no retries: the cron cadence provides the
//! retry loop by re-invoking the whole run later. The client timeout is
//! always finite so a hung server cannot hang the monitor.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{MonitorError, Result};

/// Source of raw page bodies. The live implementation is [`Fetcher`];
/// orchestrator tests substitute scripted pages.
pub trait PageSource {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| MonitorError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl PageSource for Fetcher {
    /// Fetch a page and return its body, or fail with [`MonitorError::Fetch`]
    /// on transport failure, timeout, or a non-2xx status.
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MonitorError::fetch(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| MonitorError::fetch(url, &e))?;
        debug!(bytes = body.len(), "fetched page");
        Ok(body)
    }
}

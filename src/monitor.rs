//! The run orchestrator.
//!
//! One invocation walks the pipeline once: fetch the series index, parse it,
//! compare the newest article against the processed ledger, and either
//! record-and-notify or end quietly. The state machine is
//! `Fetching → Parsing → Detecting → {Recording+Notifying | Skipping}`,
//! terminating in `Done` or `Failed`. There are no retries inside a run; the
//! external scheduler re-invokes the whole process later.
//!
//! Error policy: fetch and parse failures abort before any mutation, storage
//! failures abort after, and a failed notification is logged but never fails
//! a run whose archive append already succeeded.

use std::fmt;

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::detector::{self, Detection};
use crate::error::{MonitorError, Result};
use crate::fetcher::{Fetcher, PageSource};
use crate::models::{Article, HistoryRecord, LastChecked, RunOutcome};
use crate::notifier::{AlertSink, Notifier};
use crate::parser;
use crate::storage::{QueryFilter, ShowMatch, Storage, StorageStats};

pub struct Monitor<S: PageSource = Fetcher, A: AlertSink = Notifier> {
    config: Config,
    fetcher: S,
    storage: Storage,
    notifier: Option<A>,
}

/// What a successful run did.
#[derive(Debug)]
pub enum RunStatus {
    Recorded { article_id: String, show_count: usize },
    NoChange { article_id: String },
}

/// Everything the `status` subcommand reports.
pub struct StatusReport {
    pub last_checked: Option<LastChecked>,
    pub stats: StorageStats,
    pub latest: Option<HistoryRecord>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Seven shows monitor status")?;
        writeln!(
            f,
            "  archive: {} articles, {} shows ({} picks of the week)",
            self.stats.article_count, self.stats.show_count, self.stats.pick_count
        )?;
        writeln!(f, "  ledger: {} processed article ids", self.stats.ledger_len)?;
        writeln!(
            f,
            "  files: history {}, ledger {}, last-checked {}",
            file_state(self.stats.history_file_exists),
            file_state(self.stats.ledger_file_exists),
            file_state(self.stats.last_checked_file_exists)
        )?;
        match &self.last_checked {
            Some(last) => {
                writeln!(
                    f,
                    "  last checked: {} (outcome: {})",
                    last.checked_at.to_rfc3339(),
                    last.outcome
                )?;
                if let Some(id) = &last.article_id {
                    writeln!(f, "  last article id: {id}")?;
                }
            }
            None => writeln!(f, "  last checked: never")?,
        }
        match &self.latest {
            Some(record) => write!(
                f,
                "  latest article: {} ({})",
                record.article.title, record.article.published_at
            ),
            None => write!(f, "  latest article: none recorded"),
        }
    }
}

fn file_state(exists: bool) -> &'static str {
    if exists { "present" } else { "missing" }
}

impl Monitor {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        let notifier = match config.webhook_url.clone() {
            Some(url) => Some(Notifier::new(url, &config)?),
            None => {
                warn!("webhook not configured; notifications are disabled");
                None
            }
        };
        Monitor::from_parts(config, fetcher, notifier)
    }
}

impl<S: PageSource, A: AlertSink> Monitor<S, A> {
    fn from_parts(config: Config, fetcher: S, notifier: Option<A>) -> Result<Self> {
        let storage = Storage::new(&config)?;
        Ok(Self {
            config,
            fetcher,
            storage,
            notifier,
        })
    }

    /// Perform one full check-and-notify run, recording the outcome in the
    /// last-checked file on every path.
    #[instrument(level = "info", skip(self))]
    pub async fn run_once(&self) -> Result<RunStatus> {
        let result = self.check_for_new_shows().await;

        match &result {
            Ok(status) => {
                let (article_id, outcome) = match status {
                    RunStatus::Recorded { article_id, .. } => {
                        (Some(article_id.clone()), RunOutcome::Recorded)
                    }
                    RunStatus::NoChange { article_id } => {
                        (Some(article_id.clone()), RunOutcome::NoChange)
                    }
                };
                self.storage.write_last_checked(&LastChecked {
                    article_id,
                    checked_at: Utc::now(),
                    outcome,
                })?;
            }
            Err(e) => {
                error!(error = %e, "run failed");
                if let Err(w) = self.storage.write_last_checked(&LastChecked {
                    article_id: None,
                    checked_at: Utc::now(),
                    outcome: RunOutcome::Error,
                }) {
                    warn!(error = %w, "failed to record error outcome");
                }
                if self.config.send_error_notifications {
                    if let Some(notifier) = &self.notifier {
                        if let Err(ne) = notifier
                            .send_error_alert(
                                &e.to_string(),
                                "Error occurred while checking for new show recommendations",
                            )
                            .await
                        {
                            warn!(error = %ne, "failed to deliver error notification");
                        }
                    }
                }
            }
        }

        result
    }

    async fn check_for_new_shows(&self) -> Result<RunStatus> {
        let base_url = Url::parse(&self.config.base_url)
            .map_err(|e| MonitorError::Config(format!("base_url: {e}")))?;

        info!(url = %self.config.series_url, "fetching series index");
        let index_html = self.fetcher.fetch(&self.config.series_url).await?;
        let summaries = parser::parse_series_index(&index_html, &base_url)?;
        let newest = summaries
            .into_iter()
            .next()
            .ok_or_else(|| MonitorError::Parse("empty series index".to_string()))?;
        info!(article = %newest.title, date = %newest.published_at, "newest article in series");

        // Detect + record is the critical section; the lock is released
        // before the (best-effort) notification goes out.
        let lock = self.storage.lock()?;
        let ledger = self.storage.load_ledger()?;
        if detector::detect(&ledger, &newest.id) == Detection::AlreadySeen {
            info!(article_id = %newest.id, "article already processed; nothing to do");
            return Ok(RunStatus::NoChange {
                article_id: newest.id,
            });
        }

        info!(article_id = %newest.id, "new article detected; parsing shows");
        let article_html = self.fetcher.fetch(&newest.url).await?;
        let shows = parser::parse_show_entries(&article_html)?;

        let article = Article {
            id: newest.id.clone(),
            title: newest.title,
            url: newest.url,
            published_at: newest.published_at,
            fetched_at: Utc::now(),
        };
        self.storage.append(article.clone(), shows.clone())?;
        self.storage.record_processed(&article.id)?;
        drop(lock);

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.send_new_shows_alert(&article, &shows).await {
                warn!(error = %e, "notification failed; archive already updated");
            }
        }

        Ok(RunStatus::Recorded {
            article_id: article.id,
            show_count: shows.len(),
        })
    }

    /// Exercise fetch, parse, and notify end to end without persisting
    /// anything. Used by the `test` subcommand.
    #[instrument(level = "info", skip(self))]
    pub async fn test_components(&self) -> Result<()> {
        let base_url = Url::parse(&self.config.base_url)
            .map_err(|e| MonitorError::Config(format!("base_url: {e}")))?;

        let index_html = self.fetcher.fetch(&self.config.series_url).await?;
        let summaries = parser::parse_series_index(&index_html, &base_url)?;
        info!(count = summaries.len(), "series index parsed");

        if let Some(newest) = summaries.first() {
            let article_html = self.fetcher.fetch(&newest.url).await?;
            let shows = parser::parse_show_entries(&article_html)?;
            info!(article = %newest.title, shows = shows.len(), "newest article parsed");
        }

        match &self.notifier {
            Some(notifier) => {
                notifier.send_test_message().await?;
                info!("webhook test message delivered");
            }
            None => info!("webhook not configured; skipping notification test"),
        }

        Ok(())
    }

    pub fn status(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            last_checked: self.storage.load_last_checked()?,
            stats: self.storage.stats()?,
            latest: self.storage.recent(1)?.into_iter().next(),
        })
    }

    pub fn search(&self, filter: &QueryFilter) -> Result<Vec<ShowMatch>> {
        self.storage.query(filter)
    }
}

//! Persistence for the shows archive, the processed-articles ledger, and the
//! last-checked record.
//!
//! Three independent JSON files live under the data directory:
//!
//! ```text
//! data/
//! ├── shows_history.json        append-only archive, newest first, unbounded
//! ├── processed_articles.json   bounded ledger of processed article ids
//! └── last_checked.json         single record overwritten each run
//! ```
//!
//! The ledger and the archive are deliberately separate structures with
//! different growth policies: the ledger is a bounded dedup marker whose
//! eviction never touches the archive, while the archive is the product and
//! is never pruned. [`Storage::append`] enforces the no-duplicate invariant
//! itself rather than trusting the change detector upstream.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{MonitorError, Result};
use crate::models::{Article, HistoryRecord, LastChecked, ShowEntry};

const HISTORY_FILE: &str = "shows_history.json";
const LEDGER_FILE: &str = "processed_articles.json";
const LAST_CHECKED_FILE: &str = "last_checked.json";
const LOCK_FILE: &str = ".monitor.lock";
/// A lock file older than this is treated as an orphan from a crashed run
/// and reclaimed; a healthy run holds the lock for seconds at most.
const LOCK_STALE_SECS: u64 = 3600;

pub struct Storage {
    data_dir: PathBuf,
    ledger_cap: usize,
}

/// Aggregate counts over the archive and ledger, computed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    pub article_count: usize,
    pub show_count: usize,
    pub pick_count: usize,
    pub ledger_len: usize,
    pub history_file_exists: bool,
    pub ledger_file_exists: bool,
    pub last_checked_file_exists: bool,
}

/// Filter for [`Storage::query`]. All criteria are optional and conjunctive.
#[derive(Debug, Default)]
pub struct QueryFilter {
    /// Case-insensitive free text matched against show title, platform,
    /// and description.
    pub text: Option<String>,
    /// Case-insensitive exact platform name.
    pub platform: Option<String>,
    pub limit: Option<usize>,
}

/// A show returned from a query, with its owning article's context attached.
#[derive(Debug, Clone)]
pub struct ShowMatch {
    pub article_title: String,
    pub article_date: String,
    pub show: ShowEntry,
}

/// Guard for the detect-and-record critical section. The lock file is
/// removed on drop, including on failure paths.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}

impl Storage {
    pub fn new(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        debug!(data_dir = %config.data_dir.display(), "storage initialized");
        Ok(Self {
            data_dir: config.data_dir.clone(),
            ledger_cap: config.ledger_cap,
        })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.path(name), json)?;
        Ok(())
    }

    /// Acquire the data-directory lock, failing with
    /// [`MonitorError::Storage`] when another run holds it. Failing the run
    /// is preferred over risking a double append; the next scheduled
    /// invocation retries naturally. A lock file left behind by a run that
    /// died without unwinding (so the Drop guard never ran) is reclaimed
    /// once it is older than [`LOCK_STALE_SECS`].
    pub fn lock(&self) -> Result<RunLock> {
        self.lock_with_staleness(Duration::from_secs(LOCK_STALE_SECS))
    }

    fn lock_with_staleness(&self, max_age: Duration) -> Result<RunLock> {
        let path = self.path(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(RunLock { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if lock_age(&path).is_some_and(|age| age >= max_age) {
                    warn!(path = %path.display(), "reclaiming stale lock file");
                    fs::remove_file(&path)?;
                    return match OpenOptions::new().write(true).create_new(true).open(&path) {
                        Ok(_) => Ok(RunLock { path }),
                        Err(e) => Err(e.into()),
                    };
                }
                Err(MonitorError::Storage(format!(
                    "another run holds the lock at {}",
                    path.display()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    // ---- shows history (append-only archive) ----

    pub fn load_history(&self) -> Result<Vec<HistoryRecord>> {
        self.read_json(HISTORY_FILE)
    }

    /// Append a new article and its shows to the archive, newest first.
    ///
    /// Fails with [`MonitorError::DuplicateArticle`] when the article id is
    /// already present. Integrity does not depend on caller discipline.
    #[instrument(level = "info", skip(self, article, shows), fields(article_id = %article.id))]
    pub fn append(&self, article: Article, shows: Vec<ShowEntry>) -> Result<()> {
        let mut history = self.load_history()?;
        if history.iter().any(|r| r.article.id == article.id) {
            return Err(MonitorError::DuplicateArticle(article.id));
        }
        let count = shows.len();
        history.insert(0, HistoryRecord { article, shows });
        self.write_json(HISTORY_FILE, &history)?;
        info!(shows = count, "appended article to history");
        Ok(())
    }

    /// The `limit` most recent archive records.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let mut history = self.load_history()?;
        history.truncate(limit);
        Ok(history)
    }

    /// Search archived shows. Read-only; walks records newest first.
    pub fn query(&self, filter: &QueryFilter) -> Result<Vec<ShowMatch>> {
        let limit = filter.limit.unwrap_or(20);
        let text = filter.text.as_deref().map(str::to_lowercase);
        let platform = filter.platform.as_deref().map(str::to_lowercase);

        let mut matches = Vec::new();
        for record in self.load_history()? {
            for show in &record.shows {
                if let Some(needle) = &text {
                    let haystack = format!(
                        "{} {} {}",
                        show.title, show.platform, show.description
                    )
                    .to_lowercase();
                    if !haystack.contains(needle.as_str()) {
                        continue;
                    }
                }
                if let Some(wanted) = &platform {
                    if show.platform.to_lowercase() != *wanted {
                        continue;
                    }
                }
                if matches.len() >= limit {
                    return Ok(matches);
                }
                matches.push(ShowMatch {
                    article_title: record.article.title.clone(),
                    article_date: record.article.published_at.clone(),
                    show: show.clone(),
                });
            }
        }
        Ok(matches)
    }

    pub fn stats(&self) -> Result<StorageStats> {
        let history = self.load_history()?;
        let show_count = history.iter().map(|r| r.shows.len()).sum();
        let pick_count = history
            .iter()
            .flat_map(|r| &r.shows)
            .filter(|s| s.is_pick_of_week)
            .count();
        Ok(StorageStats {
            article_count: history.len(),
            show_count,
            pick_count,
            ledger_len: self.load_ledger()?.len(),
            history_file_exists: self.path(HISTORY_FILE).exists(),
            ledger_file_exists: self.path(LEDGER_FILE).exists(),
            last_checked_file_exists: self.path(LAST_CHECKED_FILE).exists(),
        })
    }

    // ---- processed-articles ledger (bounded dedup marker) ----

    /// Processed article ids, oldest first.
    pub fn load_ledger(&self) -> Result<Vec<String>> {
        self.read_json(LEDGER_FILE)
    }

    /// Record an article id in the ledger, evicting the oldest ids beyond
    /// the configured cap. Recording an id twice is a no-op.
    #[instrument(level = "info", skip(self))]
    pub fn record_processed(&self, id: &str) -> Result<()> {
        let mut ids = self.load_ledger()?;
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
        while ids.len() > self.ledger_cap {
            let evicted = ids.remove(0);
            debug!(%evicted, "evicted oldest id from ledger");
        }
        self.write_json(LEDGER_FILE, &ids)
    }

    // ---- last-checked record ----

    pub fn load_last_checked(&self) -> Result<Option<LastChecked>> {
        self.read_json(LAST_CHECKED_FILE)
    }

    pub fn write_last_checked(&self, record: &LastChecked) -> Result<()> {
        self.write_json(LAST_CHECKED_FILE, record)
    }
}

fn lock_age(path: &Path) -> Option<Duration> {
    fs::metadata(path).ok()?.modified().ok()?.elapsed().ok()
}

//! Data models for articles, show entries, and persisted run state.
//!
//! This module defines the core data structures used throughout the monitor:
//! - [`ArticleSummary`]: one link parsed from the series index page
//! - [`Article`]: a recorded weekly article, immutable once written
//! - [`ShowEntry`]: one recommended show within an article
//! - [`HistoryRecord`]: an article together with its shows, as archived
//! - [`LastChecked`]: the single overwritten record of the most recent run
//!
//! The archive file shapes match these structs one-to-one via serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One article link parsed from the series index page.
///
/// Summaries are transient: they exist between parsing the index and
/// deciding whether the newest article is new. Only articles that pass
/// change detection are promoted to a full [`Article`].
#[derive(Debug, Clone)]
pub struct ArticleSummary {
    /// Canonical identity derived from the URL path (not the title, which
    /// can be edited after publication).
    pub id: String,
    pub title: String,
    pub url: String,
    /// Publication date in `YYYY-MM-DD` format, extracted from the URL.
    pub published_at: String,
}

/// A weekly article as recorded in the archive.
///
/// Created once, at first successful detection; never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Publication date in `YYYY-MM-DD` format.
    pub published_at: String,
    /// When this run fetched and recorded the article.
    pub fetched_at: DateTime<Utc>,
}

/// One recommended show within an article.
///
/// Ordering within an article is significant: `position` preserves the
/// source order (1-based) across a store/retrieve round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowEntry {
    pub title: String,
    /// Normalized streaming platform name, or `"Platform not specified"`.
    pub platform: String,
    /// May be empty when the article had no usable paragraph for the show.
    pub description: String,
    /// Whether this entry carried the "pick of the week" marker.
    pub is_pick_of_week: bool,
    /// 1-based position within the source article.
    pub position: usize,
}

/// An article and its shows as one archived record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub article: Article,
    pub shows: Vec<ShowEntry>,
}

/// Outcome of a single monitor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    /// A new article was detected, archived, and (best-effort) announced.
    Recorded,
    /// The newest article was already processed; nothing changed.
    NoChange,
    /// The run aborted before or during recording.
    Error,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunOutcome::Recorded => "recorded",
            RunOutcome::NoChange => "no-change",
            RunOutcome::Error => "error",
        };
        f.write_str(s)
    }
}

/// The single overwritten record describing the most recent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastChecked {
    /// Id of the newest article seen during the run, when known.
    pub article_id: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub outcome: RunOutcome,
}

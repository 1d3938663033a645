//! Core types shared across the library

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unique identifier for a tracked series (the catalog id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId(pub u64);

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SeriesId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Publication status of a chapter as reported by the catalog source
///
/// Anything other than `Ok` contributes zero asset URLs: the chapter is
/// skipped entirely with no directory created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChapterStatus {
    /// Chapter is published and its assets are available
    Ok,
    /// Chapter is announced but its release is delayed
    Delayed,
    /// Any other status reported by the source
    Other,
}

impl ChapterStatus {
    /// Parse the source's status string (case-insensitive)
    pub fn from_source(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "OK" => Self::Ok,
            "DELAYED" => Self::Delayed,
            _ => Self::Other,
        }
    }
}

/// One row of a series listing, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSummary {
    /// Chapter id, used to fetch the detail
    pub id: u64,
    /// Raw sequence label; numeric in the common case, possibly empty or a
    /// free-text title when the source has no number
    pub label: String,
    /// Language code of this translation (e.g. "gb")
    pub language: String,
    /// Up to three owning-group ids; `0` marks an unset slot
    pub group_ids: [u64; 3],
}

impl ChapterSummary {
    /// Whether any group slot matches any of the requested group ids
    pub fn in_groups(&self, groups: &[u64]) -> bool {
        self.group_ids
            .iter()
            .any(|id| *id != 0 && groups.contains(id))
    }
}

/// Full detail for a single chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDetail {
    /// Chapter id
    pub id: u64,
    /// Raw sequence label
    pub label: String,
    /// Chapter title; used as the display name for unnumbered chapters
    pub title: String,
    /// Publication status
    pub status: ChapterStatus,
    /// Ordered asset (page image) URLs; empty unless `status` is `Ok`
    pub asset_urls: Vec<String>,
}

/// A full series listing as returned by the catalog source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesListing {
    /// Series title
    pub title: String,
    /// All chapters in source order, unfiltered
    pub chapters: Vec<ChapterSummary>,
}

/// Summary of one `download()` run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadReport {
    /// Series title from the catalog listing, if any chapters resolved
    pub series_title: Option<String>,
    /// Highest numeric chapter label fully downloaded *and* archived
    pub completed_through: Option<f64>,
    /// Number of chapters completed in this run
    pub completed: usize,
    /// Number of chapters abandoned after a fatal-for-chapter failure
    pub failed: usize,
}

impl DownloadReport {
    pub(crate) fn record_completed(&mut self, number: Option<f64>) {
        self.completed += 1;
        if let Some(n) = number {
            let max = self.completed_through.map_or(n, |cur| cur.max(n));
            self.completed_through = Some(max);
        }
    }
}

/// Progress callbacks for one series download
///
/// A single pipeline parameterized by an observer replaces verbose/silent
/// downloader variants: pass [`NoopObserver`] for a silent run, or implement
/// this trait to surface progress to an operator. All methods have empty
/// default bodies, so implementors override only what they need.
pub trait ProgressObserver: Send + Sync {
    /// The series listing resolved to `chapter_count` eligible chapters
    fn on_series(&self, _title: &str, _chapter_count: usize) {}

    /// One asset finished downloading
    fn on_asset(&self, _url: &str, _path: &Path) {}

    /// A chapter was fully downloaded and archived
    fn on_chapter_archived(&self, _name: &str, _archive: &Path) {}

    /// A chapter was abandoned, or its archive step failed
    fn on_chapter_failed(&self, _name: &str, _error: &Error) {}

    /// A zero-byte asset forced the range to be narrowed at `at`
    fn on_range_narrowed(&self, _at: f64) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

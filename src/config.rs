//! Configuration types for mangadex-dl

use crate::range::{RangeSet, SequenceRange};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Per-series download configuration
///
/// Carries everything the download orchestrator needs for one series:
/// destination, chapter window, language, group filtering and naming flags.
/// Every field has a sensible default so `DownloadConfig::default()` works
/// out of the box.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory where chapter directories and archives are written
    /// (default: "./")
    #[serde(default = "default_dest_dir")]
    pub dest_dir: PathBuf,

    /// Explicit chapter ranges; when empty, a single range is derived from
    /// `first_chapter`/`last_chapter`
    #[serde(default)]
    pub ranges: Vec<SequenceRange>,

    /// First chapter to download (default: 0, ignored if `ranges` is set)
    #[serde(default)]
    pub first_chapter: f64,

    /// Last chapter to download (default: open-ended, ignored if `ranges`
    /// is set)
    #[serde(default)]
    pub last_chapter: Option<f64>,

    /// Language code the chapters must match exactly (default: "gb")
    #[serde(default = "default_language")]
    pub language: String,

    /// Scanlation group ids to accept; empty means no group filtering
    #[serde(default)]
    pub groups: Vec<u64>,

    /// Whether chapters without a numeric label are eligible (default: true)
    #[serde(default = "default_true")]
    pub allow_unnumbered: bool,

    /// Explicit series name for ledger entries; derived from `dest_dir`'s
    /// final component when absent
    #[serde(default)]
    pub series_name: Option<String>,

    /// Prepend the series name to archive filenames (default: false)
    #[serde(default)]
    pub prepend_series_name: bool,

    /// Timeout applied to every HTTP request (default: 5 seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Retry policy for individual asset downloads
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dest_dir: default_dest_dir(),
            ranges: Vec::new(),
            first_chapter: 0.0,
            last_chapter: None,
            language: default_language(),
            groups: Vec::new(),
            allow_unnumbered: true,
            series_name: None,
            prepend_series_name: false,
            request_timeout: default_request_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl DownloadConfig {
    /// The effective range set: explicit `ranges` when present, otherwise a
    /// single range derived from `first_chapter`/`last_chapter`
    pub fn effective_ranges(&self) -> RangeSet {
        if self.ranges.is_empty() {
            RangeSet::from_bounds(self.first_chapter, self.last_chapter)
        } else {
            RangeSet::new(self.ranges.clone())
        }
    }
}

/// Retry behavior for transient asset-download failures
///
/// `max_attempts` counts *total* tries, not re-tries. The delay between
/// tries is fixed with optional jitter; no exponential backoff.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per asset before the chapter is abandoned (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (default: 500 ms)
    #[serde(default = "default_retry_delay")]
    pub delay: Duration,

    /// Add random jitter (up to +50%) to the delay (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
            jitter: true,
        }
    }
}

/// Configuration for the periodic sync scheduler
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between sync cycles (default: 1 hour)
    #[serde(default = "default_sync_interval")]
    pub interval: Duration,

    /// Library root; series without a persisted directory are synced into
    /// `<library_dir>/<series name>` (default: "./manga")
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,

    /// Timeout applied to every HTTP request (default: 5 seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Retry policy passed through to each series download
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: default_sync_interval(),
            library_dir: default_library_dir(),
            request_timeout: default_request_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_dest_dir() -> PathBuf {
    PathBuf::from("./")
}

fn default_language() -> String {
    "gb".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_sync_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("./manga")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_everything() {
        let config = DownloadConfig::default();
        let ranges = config.effective_ranges();
        assert!(ranges.contains_label("0", config.allow_unnumbered));
        assert!(ranges.contains_label("9999", config.allow_unnumbered));
        assert!(ranges.contains_label("Oneshot", config.allow_unnumbered));
        assert_eq!(config.language, "gb");
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn explicit_ranges_win_over_first_and_last() {
        let config = DownloadConfig {
            ranges: vec![SequenceRange::new(10.0, 20.0)],
            first_chapter: 0.0,
            last_chapter: Some(5.0),
            ..DownloadConfig::default()
        };
        let ranges = config.effective_ranges();
        assert!(ranges.contains_label("15", false));
        assert!(!ranges.contains_label("3", false));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = DownloadConfig {
            dest_dir: PathBuf::from("/tmp/series"),
            last_chapter: Some(42.5),
            groups: vec![8802],
            ..DownloadConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: DownloadConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dest_dir, config.dest_dir);
        assert_eq!(back.last_chapter, Some(42.5));
        assert_eq!(back.groups, vec![8802]);
    }
}

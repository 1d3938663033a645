//! JSON ledger of tracked series
//!
//! A single JSON file maps series id to a per-series record holding the
//! display name, language, destination directory and the completion
//! watermark (`lastChapter`). The scheduler reads it to decide what to poll
//! and writes back advanced watermarks after each sync cycle.
//!
//! Writes go through an internal mutex so concurrent tasks in one process
//! cannot interleave a load-modify-save. Across processes the file is
//! last-writer-wins; nothing here coordinates multiple instances.

use crate::error::{LedgerError, Result};
use crate::types::SeriesId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Watermark value for a series with no completed chapters yet
pub const NO_CHAPTERS: f64 = -1.0;

/// One tracked series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    /// Display name, also the default directory name under the library root
    pub name: String,
    /// Highest fully archived chapter number, or [`NO_CHAPTERS`]
    #[serde(rename = "lastChapter")]
    pub last_chapter: f64,
    /// Translation language code filter
    pub lang: String,
    /// Destination directory; empty means "derive from the library root"
    #[serde(default)]
    pub dir: String,
}

/// Handle to the ledger file
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Ledger {
    /// Create a handle; the file itself is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries; a missing file reads as an empty ledger
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<HashMap<u64, SeriesEntry>> {
        let _guard = self.guard();
        self.read_map()
    }

    /// Load a single entry
    ///
    /// # Errors
    /// Returns [`LedgerError::Missing`] when the ledger file does not exist,
    /// distinguishing "never tracked anything" from "series not tracked"
    /// (which reads as `Ok(None)`).
    pub fn load_entry(&self, series: SeriesId) -> Result<Option<SeriesEntry>> {
        let _guard = self.guard();
        if !self.path.exists() {
            return Err(LedgerError::Missing {
                path: self.path.clone(),
            }
            .into());
        }
        Ok(self.read_map()?.remove(&series.0))
    }

    /// Replace the ledger contents atomically with respect to other tasks
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, entries: &HashMap<u64, SeriesEntry>) -> Result<()> {
        let _guard = self.guard();
        self.write_map(entries)
    }

    /// Remove a series, keeping everything else
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or written.
    pub fn remove(&self, series: SeriesId) -> Result<()> {
        self.update(|entries| {
            entries.remove(&series.0);
        })
        .map(|_| ())
    }

    /// Run a load-modify-save cycle under the ledger lock
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or written.
    pub fn update<F, R>(&self, apply: F) -> Result<R>
    where
        F: FnOnce(&mut HashMap<u64, SeriesEntry>) -> R,
    {
        let _guard = self.guard();
        let mut entries = self.read_map()?;
        let result = apply(&mut entries);
        self.write_map(&entries)?;
        Ok(result)
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock only means another task panicked mid-write; the
        // file contents are still well-formed JSON or absent.
        self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn read_map(&self) -> Result<HashMap<u64, SeriesEntry>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let body = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn write_map(&self, entries: &HashMap<u64, SeriesEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        debug!(path = %self.path.display(), entries = entries.len(), "ledger saved");
        Ok(())
    }
}

/// Inputs for recording a finished download in the ledger
#[derive(Debug, Clone)]
pub struct CompletedSync {
    /// Series the download ran for
    pub series: SeriesId,
    /// Directory the chapters were archived into
    pub dest_dir: PathBuf,
    /// Language the download filtered on
    pub language: String,
    /// Explicit display name; when `None` the destination directory name is
    /// used
    pub series_name: Option<String>,
    /// Highest chapter number the run fully archived, if any
    pub completed_through: Option<f64>,
}

/// Create or refresh a ledger entry after a download run
///
/// A new entry starts at [`NO_CHAPTERS`] and is raised to the run's
/// watermark; an existing entry keeps its name and language and only has the
/// watermark advanced. A run that completed nothing still creates the entry
/// so the scheduler picks the series up.
///
/// # Errors
/// Returns an error if the ledger cannot be read or written.
pub fn record_completed_sync(ledger: &Ledger, sync: &CompletedSync) -> Result<SeriesEntry> {
    ledger.update(|entries| {
        let entry = entries.entry(sync.series.0).or_insert_with(|| SeriesEntry {
            name: derive_name(sync),
            last_chapter: NO_CHAPTERS,
            lang: sync.language.clone(),
            dir: sync.dest_dir.to_string_lossy().into_owned(),
        });
        if let Some(completed) = sync.completed_through {
            if completed > entry.last_chapter {
                entry.last_chapter = completed;
            }
        }
        entry.clone()
    })
}

fn derive_name(sync: &CompletedSync) -> String {
    if let Some(name) = &sync.series_name {
        return name.clone();
    }
    sync.dest_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("series-{}", sync.series))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_in(dir: &Path) -> Ledger {
        Ledger::new(dir.join("MangaList.json"))
    }

    fn entry(name: &str, last_chapter: f64) -> SeriesEntry {
        SeriesEntry {
            name: name.to_string(),
            last_chapter,
            lang: "gb".to_string(),
            dir: String::new(),
        }
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ledger_in(dir.path()).load().unwrap().is_empty());
    }

    #[test]
    fn load_entry_distinguishes_missing_file_from_missing_series() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        assert!(matches!(
            ledger.load_entry(SeriesId(1)),
            Err(crate::Error::Ledger(LedgerError::Missing { .. }))
        ));

        let mut entries = HashMap::new();
        entries.insert(1, entry("Tracked", 3.0));
        ledger.save(&entries).unwrap();

        assert!(ledger.load_entry(SeriesId(2)).unwrap().is_none());
        assert_eq!(ledger.load_entry(SeriesId(1)).unwrap(), Some(entry("Tracked", 3.0)));
    }

    #[test]
    fn entries_round_trip_with_camel_case_watermark_field() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        let mut entries = HashMap::new();
        entries.insert(47, entry("Example", 12.5));
        ledger.save(&entries).unwrap();

        let raw = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(raw.contains("\"47\""));
        assert!(raw.contains("\"lastChapter\": 12.5"));

        assert_eq!(ledger.load().unwrap(), entries);
    }

    #[test]
    fn remove_keeps_other_entries() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        let mut entries = HashMap::new();
        entries.insert(1, entry("A", 1.0));
        entries.insert(2, entry("B", 2.0));
        ledger.save(&entries).unwrap();

        ledger.remove(SeriesId(1)).unwrap();
        let remaining = ledger.load().unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.contains_key(&2));
    }

    #[test]
    fn recording_a_run_creates_the_entry_with_the_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        let recorded = record_completed_sync(
            &ledger,
            &CompletedSync {
                series: SeriesId(47),
                dest_dir: dir.path().join("One Piece"),
                language: "gb".to_string(),
                series_name: None,
                completed_through: Some(12.0),
            },
        )
        .unwrap();

        assert_eq!(recorded.name, "One Piece");
        assert_eq!(recorded.last_chapter, 12.0);
        assert_eq!(recorded.lang, "gb");
        assert_eq!(
            ledger.load_entry(SeriesId(47)).unwrap(),
            Some(recorded)
        );
    }

    #[test]
    fn explicit_series_name_overrides_the_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        let recorded = record_completed_sync(
            &ledger,
            &CompletedSync {
                series: SeriesId(5),
                dest_dir: dir.path().join("downloads"),
                language: "pl".to_string(),
                series_name: Some("Proper Title".to_string()),
                completed_through: None,
            },
        )
        .unwrap();

        assert_eq!(recorded.name, "Proper Title");
        assert_eq!(recorded.last_chapter, NO_CHAPTERS);
    }

    #[test]
    fn recording_never_lowers_an_existing_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        let mut entries = HashMap::new();
        entries.insert(9, entry("Steady", 20.0));
        ledger.save(&entries).unwrap();

        let sync = CompletedSync {
            series: SeriesId(9),
            dest_dir: dir.path().to_path_buf(),
            language: "gb".to_string(),
            series_name: None,
            completed_through: Some(7.0),
        };
        let recorded = record_completed_sync(&ledger, &sync).unwrap();
        assert_eq!(recorded.last_chapter, 20.0);

        let recorded = record_completed_sync(
            &ledger,
            &CompletedSync {
                completed_through: Some(21.0),
                ..sync
            },
        )
        .unwrap();
        assert_eq!(recorded.last_chapter, 21.0);
        assert_eq!(recorded.name, "Steady");
    }
}

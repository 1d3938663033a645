//! Error types for mangadex-dl
//!
//! This module provides the error taxonomy used throughout the library:
//! - `Error`: the main error type, including the fatal-for-catalog variants
//! - `ChapterError`: failures scoped to a single chapter (the run continues)
//! - `ArchiveError`: archive-write failures (chapter directory left intact)
//! - `LedgerError`: ledger-file failures

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mangadex-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mangadex-dl
///
/// Only `SourceUnavailable` unwinds past the download orchestrator; chapter
/// and archive failures are caught there and converted to a skip or a log
/// entry at the point of origin.
#[derive(Debug, Error)]
pub enum Error {
    /// Catalog metadata could not be fetched; aborts the whole sync for
    /// this series. The scheduler decides whether to retry on a later tick.
    #[error("catalog source unavailable: {0}")]
    SourceUnavailable(String),

    /// A single chapter could not be completed
    #[error("chapter error: {0}")]
    Chapter(#[from] ChapterError),

    /// Archive write failed (the chapter directory is left intact)
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Ledger file error
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Feed fetch or parse error
    #[error("feed error: {0}")]
    Feed(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status on a request that expected a body
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL that returned the status
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failures scoped to a single chapter
///
/// These never abort the series sync: the partial chapter directory is
/// removed, the failure is recorded for operator visibility, and processing
/// continues with the next chapter.
#[derive(Debug, Error)]
pub enum ChapterError {
    /// Chapter detail could not be fetched
    #[error("chapter {id} detail unavailable: {reason}")]
    DetailUnavailable {
        /// The chapter id whose detail fetch failed
        id: u64,
        /// The underlying failure
        reason: String,
    },

    /// An asset kept failing after the full retry budget
    #[error("failed downloading {url} after {attempts} tries")]
    RetriesExhausted {
        /// The asset URL that kept failing
        url: String,
        /// Total attempts made
        attempts: u32,
    },

    /// A zero-byte asset on a chapter without a numeric label; there is no
    /// safe narrowing point, so the chapter is abandoned
    #[error("zero-byte asset {url} on unnumbered chapter {name}, skipping chapter")]
    UnnumberedCorrupt {
        /// The chapter display name
        name: String,
        /// The asset URL that produced an empty file
        url: String,
    },
}

/// Archive-write failures
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The zip file could not be written
    #[error("failed to write archive {archive}: {reason}")]
    WriteFailed {
        /// The archive path that could not be written
        archive: PathBuf,
        /// The reason the write failed
        reason: String,
    },
}

/// Ledger-file failures
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Explicit load-by-id was attempted but the ledger file does not exist
    #[error("ledger file {path} is missing")]
    Missing {
        /// The expected ledger file path
        path: PathBuf,
    },
}

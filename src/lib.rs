//! # mangadex-dl
//!
//! Backend library for downloading and archiving manga chapters from a
//! MangaDex-style catalog.
//!
//! ## Design Philosophy
//!
//! mangadex-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Sensible defaults** - A series id and a destination are enough
//! - **Self-healing** - Corrupt assets narrow the range and restart the run
//! - **Stateful** - A JSON ledger remembers where every series left off
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mangadex_dl::{
//!     DownloadConfig, HttpCatalogSource, SeriesDownloader, SeriesId, Transport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DownloadConfig {
//!         dest_dir: "./One Piece".into(),
//!         first_chapter: 1.0,
//!         last_chapter: Some(50.0),
//!         ..Default::default()
//!     };
//!
//!     let source = Arc::new(HttpCatalogSource::new(
//!         Transport::new(config.request_timeout)?,
//!         "https://mangadex.org",
//!     ));
//!     let report = SeriesDownloader::new(SeriesId(47), source, config)?
//!         .download()
//!         .await?;
//!     println!("archived {} chapters", report.completed);
//!
//!     Ok(())
//! }
//! ```
//!
//! For unattended operation, seed a [`Ledger`] and hand it to a
//! [`SyncScheduler`], which polls each series' RSS feed on an interval and
//! downloads only what is new.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Chapter directory zipping
pub mod archive;
/// Configuration types
pub mod config;
/// Core downloader implementation
pub mod downloader;
/// Error types
pub mod error;
/// RSS feed polling
pub mod feed;
/// JSON ledger of tracked series
pub mod ledger;
/// Chapter number ranges
pub mod range;
/// Catalog listing resolution and filtering
pub mod resolver;
/// Retry logic for transient download failures
pub mod retry;
/// Catalog source abstraction and HTTP implementation
pub mod source;
/// Periodic library synchronization
pub mod sync_scheduler;
/// HTTP transport and filesystem naming helpers
pub mod transport;
/// Core types and progress events
pub mod types;

// Re-export commonly used types
pub use config::{DownloadConfig, RetryConfig, SyncConfig};
pub use downloader::SeriesDownloader;
pub use error::{ArchiveError, ChapterError, Error, LedgerError, Result};
pub use feed::{ChapterFeed, FeedEndpoint};
pub use ledger::{CompletedSync, Ledger, SeriesEntry, record_completed_sync};
pub use range::{RangeSet, SequenceRange};
pub use source::{CatalogSource, HttpCatalogSource};
pub use sync_scheduler::SyncScheduler;
pub use transport::Transport;
pub use types::{
    ChapterDetail, ChapterStatus, ChapterSummary, DownloadReport, NoopObserver, ProgressObserver,
    SeriesId, SeriesListing,
};

/// Run the sync scheduler with graceful signal handling.
///
/// Waits for a termination signal, flags the scheduler to stop, and returns
/// once the current cycle has wound down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with a `ctrl_c` fallback if
///   signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(scheduler: SyncScheduler) {
    let shutdown = scheduler.shutdown_handle();
    let running = tokio::spawn(scheduler.run());

    wait_for_signal().await;
    shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    if let Err(e) = running.await {
        tracing::error!(error = %e, "scheduler task aborted");
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        _ => {
            tracing::warn!("Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}

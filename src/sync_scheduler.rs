//! Periodic library synchronization
//!
//! [`SyncScheduler`] wakes on a fixed interval, polls the RSS feed of every
//! ledger entry, and runs a bounded download for each series with chapters
//! above its watermark. Per-series failures are logged and retried on the
//! next cycle; they never abort the cycle for other series.

use crate::config::{DownloadConfig, SyncConfig};
use crate::error::Result;
use crate::feed::{ChapterFeed, FeedEndpoint};
use crate::ledger::{Ledger, SeriesEntry};
use crate::source::CatalogSource;
use crate::transport::Transport;
use crate::types::SeriesId;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info};

/// Drives recurring sync cycles over the ledger
pub struct SyncScheduler {
    source: Arc<dyn CatalogSource>,
    ledger: Arc<Ledger>,
    feed: ChapterFeed,
    config: SyncConfig,
    shutdown: Arc<AtomicBool>,
}

impl SyncScheduler {
    /// Create a scheduler polling `endpoint` for every series in `ledger`
    ///
    /// # Errors
    /// Returns an error if the HTTP transport cannot be created.
    pub fn new(
        source: Arc<dyn CatalogSource>,
        ledger: Arc<Ledger>,
        endpoint: FeedEndpoint,
        config: SyncConfig,
    ) -> Result<Self> {
        let feed = ChapterFeed::new(Transport::new(config.request_timeout)?, endpoint);
        Ok(Self {
            source,
            ledger,
            feed,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the run loop at the next wakeup
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run sync cycles until the shutdown flag is set
    pub async fn run(self) {
        info!(interval = ?self.config.interval, "sync scheduler started");

        'cycles: loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match self.sync_all().await {
                Ok(()) => {
                    info!(
                        finished_at = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        "synchronization finished"
                    );
                }
                Err(e) => error!(error = %e, "sync cycle failed"),
            }

            // Sleep in one-second slices so shutdown stays responsive even
            // with hour-long intervals.
            let mut remaining = self.config.interval;
            while !remaining.is_zero() {
                if self.shutdown.load(Ordering::SeqCst) {
                    break 'cycles;
                }
                let slice = remaining.min(Duration::from_secs(1));
                sleep(slice).await;
                remaining -= slice;
            }
        }

        info!("sync scheduler stopped");
    }

    /// Run one full sync cycle over every ledger entry
    ///
    /// Watermarks of successfully synced series are advanced and the ledger
    /// is saved once at the end of the cycle.
    ///
    /// # Errors
    /// Returns an error when the ledger itself cannot be read or written.
    /// Per-series download errors are logged, not returned.
    pub async fn sync_all(&self) -> Result<()> {
        // Ledger file I/O is synchronous; keep it off the runtime threads.
        let ledger = Arc::clone(&self.ledger);
        let entries = tokio::task::spawn_blocking(move || ledger.load())
            .await
            .map_err(|e| crate::Error::Other(format!("ledger load task failed: {}", e)))??;
        if entries.is_empty() {
            debug!("ledger is empty, nothing to sync");
            return Ok(());
        }

        let mut updated = entries.clone();
        let mut ids: Vec<u64> = entries.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            let entry = &entries[&id];
            match self.sync_series(SeriesId(id), entry).await {
                Ok(Some(completed)) => {
                    if let Some(e) = updated.get_mut(&id) {
                        if completed > e.last_chapter {
                            e.last_chapter = completed;
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // Retried on the next cycle; the watermark is untouched.
                    error!(series = id, name = %entry.name, error = %e, "series sync failed");
                }
            }
        }

        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || ledger.save(&updated))
            .await
            .map_err(|e| crate::Error::Other(format!("ledger save task failed: {}", e)))?
    }

    /// Poll one series and download anything above its watermark
    ///
    /// Returns the new watermark when chapters were completed, `None` when
    /// the feed had nothing new.
    async fn sync_series(&self, series: SeriesId, entry: &SeriesEntry) -> Result<Option<f64>> {
        let new_numbers = self
            .feed
            .new_sequence_numbers(series, entry.last_chapter)
            .await?;
        let Some(first) = new_numbers.iter().copied().reduce(f64::min) else {
            debug!(series = %series, name = %entry.name, "no new chapters");
            return Ok(None);
        };
        let last = new_numbers.iter().copied().fold(first, f64::max);

        info!(
            series = %series,
            name = %entry.name,
            first,
            last,
            count = new_numbers.len(),
            "new chapters detected"
        );

        let dest_dir = if entry.dir.is_empty() {
            self.config.library_dir.join(&entry.name)
        } else {
            PathBuf::from(&entry.dir)
        };
        let config = DownloadConfig {
            dest_dir,
            first_chapter: first,
            last_chapter: Some(last),
            language: entry.lang.clone(),
            request_timeout: self.config.request_timeout,
            retry: self.config.retry.clone(),
            ..DownloadConfig::default()
        };

        let downloader =
            crate::downloader::SeriesDownloader::new(series, Arc::clone(&self.source), config)?;
        let report = downloader.download().await?;
        Ok(report.completed_through)
    }
}

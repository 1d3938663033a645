//! Series download orchestration
//!
//! [`SeriesDownloader`] drives the resolve → download → archive pipeline for
//! one series. Chapters are processed strictly sequentially, one HTTP request
//! in flight at a time: the range-narrowing recovery needs to know exactly
//! where in the ordered fetch sequence a corrupt asset appeared, and restarts
//! the whole pipeline from a recomputed range when it does.
//!
//! The per-chapter asset logic lives in [`assets`]; this module owns the
//! state machine:
//!
//! ```text
//! RESOLVE → for each chapter:
//!     DOWNLOAD_ASSETS → SUCCESS   → ARCHIVE → next chapter
//!                     → ITEM_FATAL→ CLEANUP → next chapter
//!                     → CORRUPT   → narrow range, restart at RESOLVE
//! ```

mod assets;


use crate::archive::archive_chapter;
use crate::config::DownloadConfig;
use crate::error::Result;
use crate::ledger::{CompletedSync, Ledger, record_completed_sync};
use crate::resolver::{ChapterFilter, resolve_chapters};
use crate::source::CatalogSource;
use crate::transport::Transport;
use crate::types::{DownloadReport, NoopObserver, ProgressObserver, SeriesId};
use std::sync::Arc;
use tracing::{error, info};

/// Outcome of one chapter's download attempt
#[derive(Debug)]
pub(crate) enum ChapterOutcome {
    /// All assets written; the chapter directory is ready to archive
    Completed {
        /// Chapter display name (directory name)
        name: String,
        /// Numeric label, when the chapter has one
        number: Option<f64>,
    },
    /// Chapter contributed no assets (delayed or otherwise unpublished)
    Skipped { name: String },
    /// Fatal-for-chapter failure; the directory has already been discarded
    Failed {
        name: String,
        error: crate::Error,
    },
    /// Zero-byte asset on a numbered chapter; narrow the range at `at` and
    /// restart resolution
    Corrupt { at: f64 },
}

/// Downloads and archives the chapters of a single series
///
/// Construct one per series sync; no state is shared between runs apart from
/// the filesystem and the ledger.
pub struct SeriesDownloader {
    pub(crate) series: SeriesId,
    pub(crate) config: DownloadConfig,
    pub(crate) source: Arc<dyn CatalogSource>,
    pub(crate) transport: Transport,
    pub(crate) observer: Arc<dyn ProgressObserver>,
}

impl SeriesDownloader {
    /// Create a downloader for `series` using the given catalog source
    ///
    /// # Errors
    /// Returns an error if the HTTP transport cannot be created.
    pub fn new(
        series: SeriesId,
        source: Arc<dyn CatalogSource>,
        config: DownloadConfig,
    ) -> Result<Self> {
        let transport = Transport::new(config.request_timeout)?;
        Ok(Self {
            series,
            config,
            source,
            transport,
            observer: Arc::new(NoopObserver),
        })
    }

    /// Attach a progress observer (replaces the default silent one)
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run the download pipeline to completion
    ///
    /// Chapter-scoped failures are recorded and skipped; zero-byte assets on
    /// numbered chapters narrow the range and restart resolution. Only a
    /// catalog-listing failure ([`crate::Error::SourceUnavailable`]) aborts
    /// the run.
    pub async fn download(&self) -> Result<DownloadReport> {
        let mut ranges = self.config.effective_ranges();
        let mut report = DownloadReport::default();

        tokio::fs::create_dir_all(&self.config.dest_dir).await?;

        'resolve: loop {
            let filter = ChapterFilter {
                groups: self.config.groups.clone(),
                ranges: ranges.clone(),
                language: self.config.language.clone(),
                allow_unnumbered: self.config.allow_unnumbered,
            };
            let resolved = resolve_chapters(self.source.as_ref(), self.series, &filter).await?;
            info!(
                series = %self.series,
                title = %resolved.title,
                chapters = resolved.chapter_ids.len(),
                "series resolved"
            );
            self.observer.on_series(&resolved.title, resolved.chapter_ids.len());
            report.series_title = Some(resolved.title.clone());

            for id in &resolved.chapter_ids {
                match self.fetch_chapter(*id).await {
                    ChapterOutcome::Completed { name, number } => {
                        self.archive_completed(&resolved.title, &name, number, &mut report)
                            .await;
                    }
                    ChapterOutcome::Skipped { name } => {
                        tracing::debug!(chapter = %name, "no assets published, skipping");
                    }
                    ChapterOutcome::Failed { name, error } => {
                        error!(chapter = %name, error = %error, "chapter abandoned");
                        self.observer.on_chapter_failed(&name, &error);
                        report.failed += 1;
                    }
                    ChapterOutcome::Corrupt { at } => {
                        // Not a failure: the remote listing may have moved, so
                        // re-resolve from a range starting at the bad chapter.
                        info!(
                            at,
                            "zero-byte asset detected, narrowing range and re-resolving"
                        );
                        self.observer.on_range_narrowed(at);
                        ranges = ranges.narrowed(at);
                        continue 'resolve;
                    }
                }
            }

            break;
        }

        info!(
            series = %self.series,
            completed = report.completed,
            failed = report.failed,
            completed_through = ?report.completed_through,
            "download finished"
        );
        Ok(report)
    }

    /// Download, then create or refresh this series' ledger entry
    ///
    /// The "manual"/auto-update mode: after the pipeline completes, the
    /// ledger entry's watermark is set to the highest chapter actually
    /// completed, creating the entry first if the series was untracked.
    pub async fn download_and_record(&self, ledger: &Ledger) -> Result<DownloadReport> {
        let report = self.download().await?;
        record_completed_sync(
            ledger,
            &CompletedSync {
                series: self.series,
                dest_dir: self.config.dest_dir.clone(),
                language: self.config.language.clone(),
                series_name: self.config.series_name.clone(),
                completed_through: report.completed_through,
            },
        )?;
        Ok(report)
    }

    /// Archive a fully downloaded chapter directory and update the report
    ///
    /// Compression is synchronous work, so it runs on the blocking pool
    /// rather than stalling the runtime for the duration of each chapter.
    async fn archive_completed(
        &self,
        series_title: &str,
        name: &str,
        number: Option<f64>,
        report: &mut DownloadReport,
    ) {
        let stem = if self.config.prepend_series_name {
            format!("{} {}", series_title, name)
        } else {
            name.to_string()
        };
        let chapter_dir = self.config.dest_dir.join(name);
        let dest_dir = self.config.dest_dir.clone();

        let archived =
            tokio::task::spawn_blocking(move || archive_chapter(&chapter_dir, &stem, &dest_dir))
                .await
                .unwrap_or_else(|e| {
                    Err(crate::Error::Other(format!("archive task failed: {}", e)))
                });

        match archived {
            Ok(archive) => {
                self.observer.on_chapter_archived(name, &archive);
                report.record_completed(number);
            }
            Err(e) => {
                // Directory stays on disk for the next run; the watermark
                // must not advance past an unarchived chapter.
                error!(chapter = %name, error = %e, "archive failed, directory kept");
                self.observer.on_chapter_failed(name, &e);
                report.failed += 1;
            }
        }
    }
}

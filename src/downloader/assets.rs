//! Per-chapter asset fetching
//!
//! Downloads every page image of one chapter into a working directory named
//! after the chapter. Any fatal condition discards the whole directory so a
//! later run starts clean; partially downloaded chapters never survive.

use super::{ChapterOutcome, SeriesDownloader};
use crate::error::{ChapterError, Error};
use crate::retry::{IsRetryable, with_retry};
use crate::transport::sanitize_filename;
use std::path::Path;
use tracing::{debug, warn};

/// Directory name for unnumbered chapters with an empty title
const UNNAMED_CHAPTER: &str = "noname";

impl SeriesDownloader {
    /// Fetch all assets of one chapter into `<dest_dir>/<chapter name>/`
    ///
    /// Every failure mode is captured in the returned [`ChapterOutcome`];
    /// this never aborts the surrounding pipeline.
    pub(crate) async fn fetch_chapter(&self, id: u64) -> ChapterOutcome {
        let detail = match self.source.chapter_detail(id).await {
            Ok(detail) => detail,
            Err(e) => {
                return ChapterOutcome::Failed {
                    name: format!("chapter {}", id),
                    error: ChapterError::DetailUnavailable {
                        id,
                        reason: e.to_string(),
                    }
                    .into(),
                };
            }
        };

        let label = detail.label.trim();
        let number = label.parse::<f64>().ok();
        let name = match number {
            // Numeric labels are zero-padded so directories and archives sort
            // naturally: "007", "012.5", "104".
            Some(_) => sanitize_filename(&format!("{:0>3}", label)),
            None => {
                let title = detail.title.trim();
                let base = if title.is_empty() { UNNAMED_CHAPTER } else { title };
                sanitize_filename(base)
            }
        };

        if detail.asset_urls.is_empty() {
            return ChapterOutcome::Skipped { name };
        }

        let chapter_dir = self.config.dest_dir.join(&name);
        if let Err(e) = tokio::fs::create_dir_all(&chapter_dir).await {
            return ChapterOutcome::Failed {
                name,
                error: e.into(),
            };
        }

        for (index, url) in detail.asset_urls.iter().enumerate() {
            let asset_name = format!("{:02}.png", index + 1);
            let path = chapter_dir.join(&asset_name);

            let written = match with_retry(&self.config.retry, || {
                self.transport.download_to_file(url, &path)
            })
            .await
            {
                Ok(written) => written,
                Err(e) => {
                    discard_chapter_dir(&chapter_dir).await;
                    let error = if e.is_retryable() {
                        ChapterError::RetriesExhausted {
                            url: url.clone(),
                            attempts: self.config.retry.max_attempts,
                        }
                        .into()
                    } else {
                        e
                    };
                    return ChapterOutcome::Failed { name, error };
                }
            };

            // An empty 200 response means the remote served a placeholder for
            // a page it does not actually have. The chapter is unusable.
            if written == 0 {
                discard_chapter_dir(&chapter_dir).await;
                return match number {
                    Some(at) => ChapterOutcome::Corrupt { at },
                    None => ChapterOutcome::Failed {
                        error: Error::from(ChapterError::UnnumberedCorrupt {
                            name: name.clone(),
                            url: url.clone(),
                        }),
                        name,
                    },
                };
            }

            debug!(chapter = %name, asset = %asset_name, bytes = written, "asset written");
            self.observer.on_asset(url, &path);
        }

        ChapterOutcome::Completed { name, number }
    }
}

/// Remove a chapter working directory after a fatal download error
async fn discard_chapter_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        warn!(dir = %dir.display(), error = %e, "failed to discard chapter directory");
    }
}

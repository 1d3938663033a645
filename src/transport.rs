//! HTTP transport primitives
//!
//! One [`Transport`] wraps a `reqwest::Client` with a bounded per-request
//! timeout. Downloads are streamed straight to disk; a helper resolves
//! filename collisions by appending a `(n)` suffix before the extension.

use crate::error::{Error, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Maximum number of suffix attempts when resolving filename collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Characters that are illegal in filenames on at least one supported platform
const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// HTTP GET / streamed-download primitive
#[derive(Clone, Debug)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    /// Create a transport whose every request is bounded by `timeout`
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mangadex-dl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// GET a URL and return the response body as text
    ///
    /// # Errors
    /// Returns `Error::HttpStatus` on a non-success status, `Error::Network`
    /// on transport failure.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// GET a URL and stream the response body to `path`, returning the number
    /// of bytes written
    ///
    /// The file is created (truncating any previous partial write), so a
    /// retried download always starts from a clean slate.
    pub async fn download_to_file(&self, url: &str, path: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(url = %url, path = %path.display(), bytes = written, "body streamed to disk");
        Ok(written)
    }
}

/// Resolve a filename collision by appending `(n)` before the extension
///
/// If `path` does not exist it is returned unchanged; otherwise the first of
/// `stem(1).ext`, `stem(2).ext`, … that does not exist is returned.
///
/// # Errors
/// Returns an error if no unique name is found within the attempt budget, or
/// if the path has no usable stem or parent.
pub fn unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Other(format!("cannot extract file stem from {}", path.display())))?;
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path
        .parent()
        .ok_or_else(|| Error::Other(format!("cannot extract parent of {}", path.display())))?;

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let name = match extension {
            Some(ext) => format!("{}({}).{}", stem, i, ext),
            None => format!("{}({})", stem, i),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(Error::Other(format!(
        "could not find a unique name for {} after {} attempts",
        path.display(),
        MAX_RENAME_ATTEMPTS
    )))
}

/// Strip characters that are illegal in filenames on common platforms
///
/// Chapter labels and titles come straight from the remote catalog, so
/// directory and archive names are sanitized before they touch the disk.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect()
}

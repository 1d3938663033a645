//! Catalog source collaborator
//!
//! The [`CatalogSource`] trait is the seam between the download pipeline and
//! the remote catalog API. [`HttpCatalogSource`] implements it against the
//! MangaDex-style JSON endpoints (`/api/manga/{id}`, `/api/chapter/{id}`);
//! tests substitute scripted in-memory sources.

use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{ChapterDetail, ChapterStatus, ChapterSummary, SeriesId, SeriesListing};
use async_trait::async_trait;
use serde::Deserialize;

/// Remote catalog of series and chapters
///
/// Any failure while listing a series must surface as
/// [`Error::SourceUnavailable`]; the resolver classifies that as fatal for
/// the whole series sync.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the full chapter listing for a series
    async fn list_chapters(&self, series: SeriesId) -> Result<SeriesListing>;

    /// Fetch the detail (status, title, asset URLs) for one chapter
    async fn chapter_detail(&self, chapter_id: u64) -> Result<ChapterDetail>;
}

/// Catalog source backed by the HTTP JSON API
#[derive(Clone, Debug)]
pub struct HttpCatalogSource {
    transport: Transport,
    base_url: String,
}

impl HttpCatalogSource {
    /// Create a source rooted at `base_url` (e.g. `https://mangadex.org`)
    pub fn new(transport: Transport, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn list_chapters(&self, series: SeriesId) -> Result<SeriesListing> {
        let url = format!("{}/api/manga/{}", self.base_url, series);
        let body = self
            .transport
            .get_text(&url)
            .await
            .map_err(|e| Error::SourceUnavailable(format!("listing fetch failed: {}", e)))?;
        let listing: RawListing = serde_json::from_str(&body)
            .map_err(|e| Error::SourceUnavailable(format!("listing parse failed: {}", e)))?;

        let chapters = listing
            .chapter
            .into_iter()
            .map(|raw| ChapterSummary {
                id: raw.id,
                label: raw.chapter,
                language: raw.lang_code,
                group_ids: [raw.group_id, raw.group_id_2, raw.group_id_3],
            })
            .collect();

        Ok(SeriesListing {
            title: listing.manga.title,
            chapters,
        })
    }

    async fn chapter_detail(&self, chapter_id: u64) -> Result<ChapterDetail> {
        let url = format!("{}/api/chapter/{}", self.base_url, chapter_id);
        let body = self.transport.get_text(&url).await?;
        let raw: RawDetail = serde_json::from_str(&body)?;

        let status = ChapterStatus::from_source(&raw.status);
        // Anything but a published chapter contributes zero assets.
        let asset_urls = if status == ChapterStatus::Ok {
            raw.page_array
        } else {
            Vec::new()
        };

        Ok(ChapterDetail {
            id: chapter_id,
            label: raw.chapter,
            title: raw.title,
            status,
            asset_urls,
        })
    }
}

/// Wire format of the series listing endpoint
#[derive(Debug, Deserialize)]
struct RawListing {
    manga: RawManga,
    #[serde(default)]
    chapter: Vec<RawChapter>,
}

#[derive(Debug, Deserialize)]
struct RawManga {
    title: String,
}

#[derive(Debug, Deserialize)]
struct RawChapter {
    id: u64,
    #[serde(default)]
    chapter: String,
    #[serde(default)]
    lang_code: String,
    #[serde(default)]
    group_id: u64,
    #[serde(default)]
    group_id_2: u64,
    #[serde(default)]
    group_id_3: u64,
}

/// Wire format of the chapter detail endpoint
#[derive(Debug, Deserialize)]
struct RawDetail {
    #[serde(default)]
    chapter: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    page_array: Vec<String>,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> Transport {
        Transport::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn parses_a_series_listing() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "manga": {"title": "Example Series"},
            "chapter": [
                {"id": 11, "chapter": "1", "lang_code": "gb", "group_id": 8802},
                {"id": 12, "chapter": "2", "lang_code": "fr"}
            ]
        });
        Mock::given(method("GET"))
            .and(path("/api/manga/100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let source = HttpCatalogSource::new(transport(), server.uri());
        let listing = source.list_chapters(SeriesId(100)).await.unwrap();

        assert_eq!(listing.title, "Example Series");
        assert_eq!(listing.chapters.len(), 2);
        assert_eq!(listing.chapters[0].group_ids, [8802, 0, 0]);
        assert_eq!(listing.chapters[1].language, "fr");
    }

    #[tokio::test]
    async fn listing_failure_is_fatal_for_the_series() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/manga/100"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpCatalogSource::new(transport(), server.uri());
        let err = source.list_chapters(SeriesId(100)).await.unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn delayed_chapters_contribute_no_assets() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "chapter": "7",
            "title": "",
            "status": "delayed",
            "page_array": ["http://cdn.example/x1.png"]
        });
        Mock::given(method("GET"))
            .and(path("/api/chapter/77"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let source = HttpCatalogSource::new(transport(), server.uri());
        let detail = source.chapter_detail(77).await.unwrap();

        assert_eq!(detail.status, ChapterStatus::Delayed);
        assert!(detail.asset_urls.is_empty());
    }

    #[tokio::test]
    async fn published_chapters_keep_their_page_urls() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "chapter": "7.5",
            "status": "OK",
            "page_array": ["http://cdn.example/p1.png", "http://cdn.example/p2.png"]
        });
        Mock::given(method("GET"))
            .and(path("/api/chapter/78"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let source = HttpCatalogSource::new(transport(), server.uri());
        let detail = source.chapter_detail(78).await.unwrap();

        assert_eq!(detail.label, "7.5");
        assert_eq!(detail.asset_urls.len(), 2);
    }
}

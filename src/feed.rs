//! RSS polling for newly published chapters
//!
//! The remote exposes a per-series RSS feed whose item titles end in
//! `Chapter <number>`. Polling that feed is much cheaper than refetching the
//! whole catalog listing, so the scheduler uses it to decide whether a series
//! needs a download run at all.

use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::SeriesId;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Item titles end in the chapter number; anything else is an announcement
const CHAPTER_TITLE_PATTERN: &str = r"Chapter ([\d.]+)$";

/// The title pattern, compiled once on first use
fn chapter_title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // A checked literal pattern cannot fail to compile at runtime.
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| Regex::new(CHAPTER_TITLE_PATTERN).expect("valid literal pattern"))
}

/// Location of the per-series RSS feeds
#[derive(Debug, Clone)]
pub struct FeedEndpoint {
    /// Site base URL, e.g. `https://mangadex.org`
    pub base_url: String,
    /// Account-scoped feed key from the site's RSS settings
    pub key: String,
}

impl FeedEndpoint {
    /// Feed URL for one series
    pub fn url_for(&self, series: SeriesId) -> String {
        format!(
            "{}/rss/{}/manga_id/{}",
            self.base_url.trim_end_matches('/'),
            self.key,
            series
        )
    }
}

/// RSS client for chapter-release feeds
#[derive(Debug)]
pub struct ChapterFeed {
    transport: Transport,
    endpoint: FeedEndpoint,
}

impl ChapterFeed {
    /// Create a feed client
    pub fn new(transport: Transport, endpoint: FeedEndpoint) -> Self {
        Self { transport, endpoint }
    }

    /// Chapter numbers published since `watermark`, in feed order
    ///
    /// Feed items without a trailing chapter number (announcements, oneshots)
    /// are ignored, as are chapters at or below the watermark.
    ///
    /// # Errors
    /// Returns [`Error::Feed`] when the feed cannot be fetched or parsed.
    pub async fn new_sequence_numbers(
        &self,
        series: SeriesId,
        watermark: f64,
    ) -> Result<Vec<f64>> {
        let url = self.endpoint.url_for(series);
        let body = self
            .transport
            .get_text(&url)
            .await
            .map_err(|e| Error::Feed(format!("fetching {} failed: {}", url, e)))?;

        let mut numbers = parse_chapter_numbers(&body)?;
        numbers.retain(|n| *n > watermark);
        debug!(series = %series, watermark, new = numbers.len(), "feed polled");
        Ok(numbers)
    }
}

/// Extract chapter numbers from an RSS document
///
/// # Errors
/// Returns [`Error::Feed`] when the document is not valid RSS.
pub fn parse_chapter_numbers(xml: &str) -> Result<Vec<f64>> {
    let channel = xml
        .parse::<rss::Channel>()
        .map_err(|e| Error::Feed(format!("invalid feed document: {}", e)))?;
    let pattern = chapter_title_pattern();

    Ok(channel
        .items()
        .iter()
        .filter_map(|item| item.title())
        .filter_map(|title| pattern.captures(title))
        .filter_map(|captures| captures.get(1)?.as_str().parse::<f64>().ok())
        .collect())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed_document(titles: &[&str]) -> String {
        let items: String = titles
            .iter()
            .map(|t| format!("<item><title>{}</title></item>", t))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <rss version=\"2.0\"><channel>\
             <title>Example Series</title>\
             <link>https://example.org</link>\
             <description>releases</description>{}</channel></rss>",
            items
        )
    }

    #[test]
    fn extracts_trailing_chapter_numbers() {
        let xml = feed_document(&[
            "Example Series - Chapter 13",
            "Example Series - Chapter 12.5",
            "Site maintenance announcement",
            "Example Series - Oneshot",
        ]);
        assert_eq!(parse_chapter_numbers(&xml).unwrap(), vec![13.0, 12.5]);
    }

    #[test]
    fn the_title_pattern_is_compiled_once_and_shared() {
        let xml = feed_document(&["Example Series - Chapter 3"]);
        assert_eq!(parse_chapter_numbers(&xml).unwrap(), vec![3.0]);
        assert_eq!(parse_chapter_numbers(&xml).unwrap(), vec![3.0]);
        assert!(std::ptr::eq(chapter_title_pattern(), chapter_title_pattern()));
    }

    #[test]
    fn invalid_document_is_a_feed_error() {
        assert!(matches!(
            parse_chapter_numbers("this is not xml"),
            Err(Error::Feed(_))
        ));
    }

    #[test]
    fn endpoint_builds_per_series_urls() {
        let endpoint = FeedEndpoint {
            base_url: "https://mangadex.org/".to_string(),
            key: "abc123".to_string(),
        };
        assert_eq!(
            endpoint.url_for(SeriesId(47)),
            "https://mangadex.org/rss/abc123/manga_id/47"
        );
    }

    #[tokio::test]
    async fn polling_filters_by_watermark() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/key/manga_id/47"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(feed_document(&[
                    "Example Series - Chapter 15",
                    "Example Series - Chapter 14",
                    "Example Series - Chapter 13",
                ])),
            )
            .mount(&server)
            .await;

        let feed = ChapterFeed::new(
            Transport::new(Duration::from_secs(5)).unwrap(),
            FeedEndpoint {
                base_url: server.uri(),
                key: "key".to_string(),
            },
        );

        let numbers = feed
            .new_sequence_numbers(SeriesId(47), 13.0)
            .await
            .unwrap();
        assert_eq!(numbers, vec![15.0, 14.0]);
    }

    #[tokio::test]
    async fn unreachable_feed_is_a_feed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let feed = ChapterFeed::new(
            Transport::new(Duration::from_secs(5)).unwrap(),
            FeedEndpoint {
                base_url: server.uri(),
                key: "key".to_string(),
            },
        );

        assert!(matches!(
            feed.new_sequence_numbers(SeriesId(1), 0.0).await,
            Err(Error::Feed(_))
        ));
    }
}

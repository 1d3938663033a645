//! Chapter resolution: listing fetch, filtering and deduplication

use crate::range::RangeSet;
use crate::source::CatalogSource;
use crate::types::SeriesId;
use std::collections::HashSet;

/// Filters applied to a series listing before downloading
#[derive(Clone, Debug)]
pub struct ChapterFilter {
    /// Scanlation group ids to accept; empty disables group filtering
    pub groups: Vec<u64>,
    /// Eligible chapter ranges
    pub ranges: RangeSet,
    /// Language code chapters must match exactly
    pub language: String,
    /// Whether chapters without a numeric label are eligible
    pub allow_unnumbered: bool,
}

/// A resolved series: title plus the ordered chapter ids left after filtering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSeries {
    /// Series title from the listing
    pub title: String,
    /// Chapter ids to download, in filtered-source order
    pub chapter_ids: Vec<u64>,
}

/// Resolve the chapter ids to download for one series
///
/// Applies, in order: group membership (when requested), range membership,
/// exact language match, then deduplication by raw label keeping the first
/// occurrence in source order. A listing fetch failure surfaces as
/// [`crate::Error::SourceUnavailable`] and aborts the series sync.
pub async fn resolve_chapters(
    source: &dyn CatalogSource,
    series: SeriesId,
    filter: &ChapterFilter,
) -> crate::Result<ResolvedSeries> {
    let listing = source.list_chapters(series).await?;
    tracing::debug!(
        series = %series,
        title = %listing.title,
        total = listing.chapters.len(),
        "series listing fetched"
    );

    let mut seen_labels: HashSet<String> = HashSet::new();
    let chapter_ids = listing
        .chapters
        .iter()
        .filter(|c| filter.groups.is_empty() || c.in_groups(&filter.groups))
        .filter(|c| filter.ranges.contains_label(&c.label, filter.allow_unnumbered))
        .filter(|c| c.language == filter.language)
        // First occurrence in source order wins on duplicate labels.
        .filter(|c| seen_labels.insert(c.label.clone()))
        .map(|c| c.id)
        .collect();

    Ok(ResolvedSeries {
        title: listing.title,
        chapter_ids,
    })
}

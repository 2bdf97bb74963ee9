use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use super::{LeaderboardParser, PageFetcher, ProfileEntry, ScrapeError, SegmentRequest};

/// Pages in flight at once: the one being parsed and the next one
const PIPELINE_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Upper bound on pages fetched after page 0
    pub pages_per_leaderboard: u32,
    pub entries_per_page: u32,
}

/// `floor(total_entries / entries_per_page)`, zero when the page size is zero
pub fn total_pages(total_entries: u32, entries_per_page: u32) -> u32 {
    total_entries.checked_div(entries_per_page).unwrap_or(0)
}

/// Number of pages to fetch after page 0
pub fn pages_to_fetch(total_entries: u32, settings: PipelineSettings) -> u32 {
    total_pages(total_entries, settings.entries_per_page).min(settings.pages_per_leaderboard)
}

/// Scrapes every page of one segment for a profile
pub struct ScrapePipeline {
    fetcher: Arc<dyn PageFetcher>,
    parser: LeaderboardParser,
    settings: PipelineSettings,
}

impl ScrapePipeline {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: LeaderboardParser, settings: PipelineSettings) -> Self {
        Self {
            fetcher,
            parser,
            settings,
        }
    }

    /// Matched entries of all fetched pages, in page order.
    ///
    /// Page 0 is fetched first to learn the entry count. The remaining pages
    /// are pipelined so that page `i` is in flight while page `i - 1` is parsed.
    /// Dropping the returned future cancels any outstanding fetch.
    pub async fn scrape(&self, request: &SegmentRequest) -> Result<Vec<ProfileEntry>, ScrapeError> {
        if request.profile.trim().is_empty() {
            return Err(ScrapeError::MissingRequestParameters("profile".to_string()));
        }

        let segment = &request.segment;
        let profile = request.profile.as_str();

        let first = self.fetcher.fetch_page(segment, 0).await?;
        let total_entries = self.parser.total_entries(&first);

        if total_pages(total_entries, self.settings.entries_per_page) == 0 {
            info!("Segment {} reports {} entries, nothing to scrape", segment, total_entries);
            return Ok(Vec::new());
        }

        let pages = pages_to_fetch(total_entries, self.settings);
        info!(
            "Scraping {} for {}: {} entries, fetching pages 0..={}",
            segment, profile, total_entries, pages
        );

        let mut entries = self.parser.parse_page(&first, profile)?;

        let mut in_flight = stream::iter(1..=pages)
            .map(|page| self.fetcher.fetch_page(segment, page))
            .buffered(PIPELINE_DEPTH);

        let mut page = 1;
        while let Some(markup) = in_flight.next().await {
            let found = self.parser.parse_page(&markup?, profile)?;
            debug!("{} page {}: {} rows for {}", segment, page, found.len(), profile);
            entries.extend(found);
            page += 1;
        }

        info!("Segment {} done: {} rows for {}", segment, entries.len(), profile);
        Ok(entries)
    }
}

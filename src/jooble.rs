use log::{error, info, warn};

use crate::fetch::{sleep_range, FetchConfig, PageFetcher};
use crate::models::RawListing;
use crate::parse::PageParser;

pub const SEARCH_HOST: &str = "https://it.jooble.org/SearchResult";

/// Listings per full result page; a shorter page is the last one.
pub const PAGE_SIZE: usize = 10;

pub fn build_search_url(keywords: &str, location: &str) -> String {
    let mut url = format!("{SEARCH_HOST}?ukw={}", urlencoding::encode(keywords));
    if !location.is_empty() {
        url.push_str("&rgns=");
        url.push_str(&urlencoding::encode(location));
    }
    url
}

/// Walk result pages for one search phrase until the results run out, a
/// page fails, or `max_pages` is reached. Failures shrink the result set;
/// they never propagate to the caller.
pub fn fetch_jobs<F: PageFetcher>(
    fetcher: &F,
    config: &FetchConfig,
    keywords: &str,
    location: &str,
    max_pages: usize,
) -> Vec<RawListing> {
    let base_url = build_search_url(keywords, location);
    let parser = PageParser::new();
    let mut all_jobs = Vec::new();

    for page in 0..max_pages {
        let url = format!("{base_url}&start={}", page * PAGE_SIZE);
        info!("Fetching Jooble page {}...", page + 1);

        let html = match fetcher.fetch(&url, keywords) {
            Ok(html) => html,
            Err(e) => {
                error!("Failed to fetch content for Jooble page {}: {e:#}", page + 1);
                break;
            }
        };

        let listings = parser.parse(&html);
        if listings.is_empty() {
            warn!("No job listings found on Jooble page {}", page + 1);
            break;
        }

        let page_count = listings.len();
        all_jobs.extend(listings);

        if page_count < PAGE_SIZE {
            break;
        }

        sleep_range(config.page_delay);
    }

    all_jobs
}

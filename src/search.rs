use anyhow::Result;
use log::info;

use crate::db::Database;
use crate::fetch::{FetchConfig, PageFetcher};
use crate::filter::{filter_listings, FilterThresholds};
use crate::jooble;
use crate::models::{RawListing, SearchSummary};
use crate::widen::SynonymTable;

/// Source tag written with every row this engine stores.
pub const SOURCE: &str = "jooble";

pub struct SearchConfig {
    pub fetch: FetchConfig,
    pub thresholds: FilterThresholds,
    pub synonyms: SynonymTable,
    pub max_pages: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            thresholds: FilterThresholds::default(),
            synonyms: SynonymTable::default(),
            max_pages: 10,
        }
    }
}

/// Top-level coordinator for one acquisition run: widen the phrase, trawl
/// every variant sequentially, filter the merged harvest, persist what
/// survives. The only component that knows the pipeline order.
pub struct SearchEngine<F: PageFetcher> {
    fetcher: F,
    config: SearchConfig,
}

impl<F: PageFetcher> SearchEngine<F> {
    pub fn new(fetcher: F, config: SearchConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn run(&self, db: &mut Database, keywords: &str, location: &str) -> Result<SearchSummary> {
        let widened = self.config.synonyms.widen(keywords);
        info!("Widened '{keywords}' into {} search phrase(s)", widened.len());

        let mut harvested: Vec<RawListing> = Vec::new();
        for phrase in &widened {
            let listings = jooble::fetch_jobs(
                &self.fetcher,
                &self.config.fetch,
                phrase,
                location,
                self.config.max_pages,
            );
            info!("Phrase '{phrase}' yielded {} listing(s)", listings.len());
            harvested.extend(listings);
        }

        let filtered = filter_listings(harvested, &widened, keywords, &self.config.thresholds);
        let total_filtered = filtered.len();
        let new_jobs = db.upsert_listings(&filtered, SOURCE)?;

        Ok(SearchSummary {
            new_jobs,
            total_filtered,
        })
    }
}

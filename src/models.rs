use serde::{Deserialize, Serialize};

/// Sentinel stored for any field a job card did not provide.
pub const MISSING: &str = "N/A";

/// One job card as scraped from a result page. Lives only for the duration
/// of a search run; persistence happens through the store's upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,
    pub company: String,
    pub location: String,
    pub posted_time: String,
    pub description: String,
    pub jobkey: String,
}

impl Default for RawListing {
    fn default() -> Self {
        Self {
            title: MISSING.to_string(),
            company: MISSING.to_string(),
            location: MISSING.to_string(),
            posted_time: MISSING.to_string(),
            description: MISSING.to_string(),
            jobkey: MISSING.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredJob {
    pub id: i64,
    pub uniqueid: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub jobkey: String,
    pub fetched_date: String,
    pub read: bool,
    pub applied: bool,
    pub source: String, // "jooble", etc.
}

/// Counts reported at the end of one search run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchSummary {
    pub new_jobs: usize,
    pub total_filtered: usize,
}

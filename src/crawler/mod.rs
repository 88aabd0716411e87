//! Crawler module for race discovery and result fetching
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and legacy-encoding decoding
//! - Listing and result-table extraction
//! - Rate limiting and cooperative stopping
//! - Overall crawl coordination and outcome reporting

mod coordinator;
mod fetcher;
mod limiter;
mod parser;
mod report;
mod source;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, fetch_page, user_agent_string, FetchResult};
pub use limiter::{RateLimiter, StopSignal, Throttle};
pub use parser::{
    extract_participant_result, parse_race_ids, parse_race_record, LayoutMismatch,
    RESULT_COLUMNS,
};
pub use report::{CrawlReport, DayOutcome, DayStatus, RaceOutcome, RaceStatus};
pub use source::{HttpRaceSource, RaceSource};

use crate::config::Config;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and open the configured store
/// 2. Snapshot the race ids already persisted
/// 3. Walk the configured number of days from today backward
/// 4. Fetch and persist every race not seen before
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished (or was stopped)
/// * `Err(FurlongError)` - Crawl could not be set up
pub async fn crawl(config: &Config, stop: StopSignal) -> crate::Result<CrawlReport> {
    run_crawl(config, stop).await
}

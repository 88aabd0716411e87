//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process:
//! - Taking a snapshot of already persisted races
//! - Walking the days from today backward
//! - Skipping known races before any delay is spent on them
//! - Rate-limited fetching and persisting of new races
//! - Honouring stop requests between races and between days

use crate::config::Config;
use crate::crawler::limiter::{RateLimiter, StopSignal, Throttle};
use crate::crawler::report::{CrawlReport, DayStatus, RaceStatus};
use crate::crawler::source::{HttpRaceSource, RaceSource};
use crate::race::{DateKey, RaceId};
use crate::storage::{open_store, ExistingIdentifierCatalog, RecordStore};
use chrono::{Local, NaiveDate};
use std::collections::HashSet;

/// Main crawler coordinator structure
///
/// Owns the known set exclusively. It starts as the store snapshot (or an
/// injected set) and grows by every race persisted during the run.
pub struct Coordinator<S, L, R> {
    source: S,
    limiter: L,
    store: R,
    known: HashSet<RaceId>,
    attempted: HashSet<RaceId>,
    days: u32,
    stop: StopSignal,
}

impl<S, L, R> Coordinator<S, L, R>
where
    S: RaceSource,
    L: Throttle,
    R: RecordStore,
{
    /// Creates a coordinator whose known set is scanned from `store`
    pub fn new(source: S, limiter: L, store: R, days: u32, stop: StopSignal) -> Self {
        let known = ExistingIdentifierCatalog::load(&store);
        Self::with_known(source, limiter, store, known, days, stop)
    }

    /// Creates a coordinator with an explicit starting known set
    pub fn with_known(
        source: S,
        limiter: L,
        store: R,
        known: HashSet<RaceId>,
        days: u32,
        stop: StopSignal,
    ) -> Self {
        Self {
            source,
            limiter,
            store,
            known,
            attempted: HashSet::new(),
            days,
            stop,
        }
    }

    pub fn known(&self) -> &HashSet<RaceId> {
        &self.known
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn limiter(&self) -> &L {
        &self.limiter
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consumes the coordinator, handing back the known set and the store
    pub fn into_parts(self) -> (HashSet<RaceId>, R) {
        (self.known, self.store)
    }

    /// Crawls `days` days ending at `today`, newest first
    ///
    /// Never fails: per-day and per-race errors are logged and recorded in
    /// the returned report.
    pub async fn run(&mut self, today: NaiveDate) -> CrawlReport {
        let mut report = CrawlReport::default();
        tracing::info!("Starting crawl for the past {} days", self.days);

        for offset in 0..self.days {
            if self.stop.is_stopped() {
                report.stopped = true;
                break;
            }

            let date = DateKey::days_before(today, offset);
            if !self.crawl_day(date, &mut report).await {
                report.stopped = true;
                break;
            }
        }

        report.log_summary();
        report
    }

    /// Processes one day; returns `false` if a stop was requested
    async fn crawl_day(&mut self, date: DateKey, report: &mut CrawlReport) -> bool {
        tracing::info!("Processing date {}", date);

        let race_ids = match self.source.race_ids(&date).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Failed to fetch race ids for {}: {}", date, e);
                report.record_day(date, DayStatus::Failed(e.to_string()));
                return true;
            }
        };

        if race_ids.is_empty() {
            tracing::info!("No races found for {}, skipping", date);
            report.record_day(date, DayStatus::NoRaces);
            return true;
        }

        tracing::info!("Found {} races for {}", race_ids.len(), date);
        report.record_day(date, DayStatus::Listed(race_ids.len()));

        for race_id in race_ids {
            if self.stop.is_stopped() {
                return false;
            }
            if !self.crawl_race(race_id, report).await {
                return false;
            }
        }

        true
    }

    /// Processes one race; returns `false` if a stop was requested
    async fn crawl_race(&mut self, race_id: RaceId, report: &mut CrawlReport) -> bool {
        if self.known.contains(&race_id) {
            tracing::debug!("Skipping race {}: already saved", race_id);
            report.record_race(race_id, RaceStatus::Skipped);
            return true;
        }

        if self.attempted.contains(&race_id) {
            tracing::debug!("Skipping race {}: already attempted in this run", race_id);
            report.record_race(race_id, RaceStatus::Repeated);
            return true;
        }

        if !self.limiter.wait(&self.stop).await {
            return false;
        }

        tracing::info!("Fetching data for race {}", race_id);
        self.attempted.insert(race_id.clone());

        let record = match self.source.race_record(&race_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Failed to fetch race data for {}: {}", race_id, e);
                report.record_race(race_id, RaceStatus::FetchFailed(e.to_string()));
                return true;
            }
        };

        if record.is_empty() {
            tracing::info!("No result rows for race {}, not saving", race_id);
            report.record_race(race_id, RaceStatus::Empty);
            return true;
        }

        match self.store.save(&race_id, &record) {
            Ok(()) => {
                tracing::info!("Saved {} rows for race {}", record.len(), race_id);
                self.known.insert(race_id.clone());
                report.record_race(race_id, RaceStatus::Saved { rows: record.len() });
            }
            Err(e) => {
                tracing::error!("Failed to persist race {}: {}", race_id, e);
                report.record_race(race_id, RaceStatus::PersistFailed(e.to_string()));
            }
        }

        true
    }
}

/// Runs a crawl as configured, ending at today's local date
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `stop` - Cooperative stop signal; a stop ends the run early with a report
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished or was stopped
/// * `Err(FurlongError)` - The HTTP client or the store could not be set up
///
/// # Example
///
/// ```no_run
/// use furlong::config::load_config;
/// use furlong::crawler::{run_crawl, StopSignal};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("furlong.toml"))?;
/// let report = run_crawl(&config, StopSignal::new()).await?;
/// println!("saved {} races", report.saved());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, stop: StopSignal) -> crate::Result<CrawlReport> {
    let source = HttpRaceSource::from_config(config)?;
    let limiter = RateLimiter::new(config.crawler.delay());
    let store = open_store(&config.output)?;

    let mut coordinator = Coordinator::new(source, limiter, store, config.crawler.days, stop);
    Ok(coordinator.run(Local::now().date_naive()).await)
}

//! Per-day and per-race outcomes of a crawl run
//!
//! Failures never abort a run; they are recorded here instead so callers and
//! tests can count them without scraping log output.

use crate::race::{DateKey, RaceId};

/// What happened when a day's listing was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayStatus {
    /// The listing named this many distinct races
    Listed(usize),
    /// No listing for the day, or a listing without race links
    NoRaces,
    /// The listing could not be fetched; treated as a day without races
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOutcome {
    pub date: DateKey,
    pub status: DayStatus,
}

/// What happened to a single race id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceStatus {
    /// Already persisted before or earlier in this run; no fetch, no delay
    Skipped,
    /// Already attempted earlier in this run without success
    Repeated,
    /// Fetched and persisted
    Saved { rows: usize },
    /// Fetched, but the page had no result rows; left for a later run
    Empty,
    /// The detail page could not be fetched or read
    FetchFailed(String),
    /// The record was fetched but could not be written
    PersistFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceOutcome {
    pub race_id: RaceId,
    pub status: RaceStatus,
}

/// Structured log of one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub days: Vec<DayOutcome>,
    pub races: Vec<RaceOutcome>,
    /// Whether the run ended early on a stop request
    pub stopped: bool,
}

impl CrawlReport {
    pub(crate) fn record_day(&mut self, date: DateKey, status: DayStatus) {
        self.days.push(DayOutcome { date, status });
    }

    pub(crate) fn record_race(&mut self, race_id: RaceId, status: RaceStatus) {
        self.races.push(RaceOutcome { race_id, status });
    }

    fn count_races(&self, pred: impl Fn(&RaceStatus) -> bool) -> usize {
        self.races.iter().filter(|r| pred(&r.status)).count()
    }

    pub fn saved(&self) -> usize {
        self.count_races(|s| matches!(s, RaceStatus::Saved { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count_races(|s| matches!(s, RaceStatus::Skipped | RaceStatus::Repeated))
    }

    pub fn empty(&self) -> usize {
        self.count_races(|s| matches!(s, RaceStatus::Empty))
    }

    pub fn fetch_failures(&self) -> usize {
        self.count_races(|s| matches!(s, RaceStatus::FetchFailed(_)))
    }

    pub fn persist_failures(&self) -> usize {
        self.count_races(|s| matches!(s, RaceStatus::PersistFailed(_)))
    }

    pub fn failed_days(&self) -> usize {
        self.days
            .iter()
            .filter(|d| matches!(d.status, DayStatus::Failed(_)))
            .count()
    }

    /// Number of detail pages actually requested
    pub fn fetched(&self) -> usize {
        self.saved() + self.empty() + self.fetch_failures() + self.persist_failures()
    }

    /// Status of the last outcome recorded for `race_id`
    pub fn status_of(&self, race_id: &RaceId) -> Option<&RaceStatus> {
        self.races
            .iter()
            .rev()
            .find(|r| &r.race_id == race_id)
            .map(|r| &r.status)
    }

    pub(crate) fn log_summary(&self) {
        tracing::info!(
            "Crawl finished{}: {} days ({} failed), {} saved, {} skipped, {} empty, {} fetch failures, {} persist failures",
            if self.stopped { " early (stop requested)" } else { "" },
            self.days.len(),
            self.failed_days(),
            self.saved(),
            self.skipped(),
            self.empty(),
            self.fetch_failures(),
            self.persist_failures()
        );
    }
}

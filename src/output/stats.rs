//! Statistics generation from the persisted store
//!
//! This module provides functionality for extracting and displaying
//! store statistics.

use crate::race::RaceId;
use crate::storage::RecordStore;

/// Store statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Number of persisted races
    pub races: usize,

    /// Number of participant rows across all races
    pub participants: usize,

    /// Lowest persisted race id
    pub first_race: Option<RaceId>,

    /// Highest persisted race id
    pub last_race: Option<RaceId>,
}

/// Loads statistics from the store
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(FurlongError)` - A unit could not be read
pub fn load_statistics(store: &dyn RecordStore) -> crate::Result<StoreStatistics> {
    let all = store.load_all()?;

    Ok(StoreStatistics {
        races: all.len(),
        participants: all.iter().map(|(_, record)| record.len()).sum(),
        first_race: all.first().map(|(id, _)| id.clone()),
        last_race: all.last().map(|(id, _)| id.clone()),
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("  Races saved: {}", stats.races);
    println!("  Participant rows: {}", stats.participants);

    if stats.races > 0 {
        println!(
            "  Average field size: {:.1}",
            stats.participants as f64 / stats.races as f64
        );
    }

    if let (Some(first), Some(last)) = (&stats.first_race, &stats.last_race) {
        println!("  Race id range: {} .. {}", first, last);
    }
}

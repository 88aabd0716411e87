//! Output module for reading persisted races back out
//!
//! This module handles:
//! - Flattening every persisted race into one participant sequence, with the
//!   race id injected into each row (the shape analysis tooling consumes)
//! - Exporting that sequence as JSON
//! - Store statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};

use crate::race::FlatParticipantResult;
use crate::storage::RecordStore;
use crate::FurlongError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Flattens every persisted race into a single sequence
///
/// Races come in ascending id order; rows keep their stored order.
///
/// # Returns
///
/// * `Ok(Vec<FlatParticipantResult>)` - All rows of all races
/// * `Err(FurlongError)` - A unit could not be read
pub fn flatten_records(store: &dyn RecordStore) -> crate::Result<Vec<FlatParticipantResult>> {
    let flat = store
        .load_all()?
        .into_iter()
        .flat_map(|(race_id, record)| {
            record.into_iter().map(move |result| FlatParticipantResult {
                race_id: race_id.clone(),
                result,
            })
        })
        .collect();

    Ok(flat)
}

/// Writes the flattened sequence to `path` as a pretty JSON array
///
/// # Returns
///
/// * `Ok(usize)` - Number of participant rows written
/// * `Err(FurlongError)` - Reading the store or writing the file failed
pub fn export_json(store: &dyn RecordStore, path: &Path) -> crate::Result<usize> {
    let flat = flatten_records(store)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, &flat)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| FurlongError::Io(e.error))?;

    tracing::info!("Exported {} rows to {}", flat.len(), path.display());
    Ok(flat.len())
}

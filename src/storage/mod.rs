//! Storage module for persisting race records
//!
//! This module handles the durable side of the crawl:
//! - The `RecordStore` trait and its error type
//! - A directory-of-JSON-files backend (default)
//! - A SQLite backend
//! - The startup catalog of race ids that are already persisted

mod json_dir;
mod schema;
mod sqlite;
mod traits;

pub use json_dir::JsonDirStore;
pub use sqlite::SqliteStore;
pub use traits::{RecordStore, StorageError, StorageResult};

use crate::config::{OutputConfig, StorageBackend};
use crate::race::RaceId;
use std::collections::HashSet;

/// Opens the store selected by the output configuration
///
/// # Returns
///
/// * `Ok(Box<dyn RecordStore>)` - The configured store
/// * `Err(StorageError)` - The SQLite database could not be opened
pub fn open_store(config: &OutputConfig) -> StorageResult<Box<dyn RecordStore>> {
    match config.backend {
        StorageBackend::Json => Ok(Box::new(JsonDirStore::new(&config.data_dir))),
        StorageBackend::Sqlite => Ok(Box::new(SqliteStore::new(&config.database_path)?)),
    }
}

/// Snapshot of the race ids already persisted when a run starts
pub struct ExistingIdentifierCatalog;

impl ExistingIdentifierCatalog {
    /// Scans the store once
    ///
    /// A store that cannot be scanned counts as empty: the run then refetches
    /// what it finds, which is safe because saves are idempotent.
    pub fn load(store: &dyn RecordStore) -> HashSet<RaceId> {
        match store.existing_ids() {
            Ok(ids) => {
                tracing::info!("Found {} existing races; these will be skipped", ids.len());
                ids
            }
            Err(e) => {
                tracing::warn!("Could not scan existing races, assuming none: {}", e);
                HashSet::new()
            }
        }
    }
}

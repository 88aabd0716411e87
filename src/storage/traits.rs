//! Storage traits and error types
//!
//! This module defines the trait interface for persisted race stores and
//! associated error types.

use crate::race::{RaceId, RaceRecord};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error for race {race_id}: {source}")]
    Serialization {
        race_id: String,
        source: serde_json::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Race not found: {0}")]
    RaceNotFound(String),

    #[error("Refusing to persist an empty record for race {0}")]
    EmptyRecord(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for persisted race stores
///
/// A store holds one unit per race id. A unit that exists is complete: every
/// implementation commits a save all-or-nothing, so a crash mid-write never
/// leaves a unit that `existing_ids` reports but `load` cannot read.
pub trait RecordStore {
    /// Scans the store and returns the ids of every persisted unit
    fn existing_ids(&self) -> StorageResult<HashSet<RaceId>>;

    /// Atomically writes the unit for `race_id`
    ///
    /// Saving an id twice replaces the earlier unit. Empty records are
    /// rejected with `StorageError::EmptyRecord`.
    fn save(&mut self, race_id: &RaceId, record: &RaceRecord) -> StorageResult<()>;

    /// Reads back the unit for `race_id`
    fn load(&self, race_id: &RaceId) -> StorageResult<RaceRecord>;

    /// Reads every unit, ordered by race id
    fn load_all(&self) -> StorageResult<Vec<(RaceId, RaceRecord)>>;
}

impl<T: RecordStore + ?Sized> RecordStore for Box<T> {
    fn existing_ids(&self) -> StorageResult<HashSet<RaceId>> {
        (**self).existing_ids()
    }

    fn save(&mut self, race_id: &RaceId, record: &RaceRecord) -> StorageResult<()> {
        (**self).save(race_id, record)
    }

    fn load(&self, race_id: &RaceId) -> StorageResult<RaceRecord> {
        (**self).load(race_id)
    }

    fn load_all(&self) -> StorageResult<Vec<(RaceId, RaceRecord)>> {
        (**self).load_all()
    }
}

//! JSON directory storage implementation
//!
//! Each race lives in `<dir>/<race-id>.json` as a pretty-printed array of
//! participant rows. Writes go to a temporary file in the same directory
//! which is synced and then renamed over the final name. Temporary files
//! left behind by an interrupted writer are removed on the next scan.

use crate::race::{RaceId, RaceRecord};
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use std::collections::HashSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::Builder;

const EXTENSION: &str = "json";

/// Name prefix of in-flight unit writes
const TEMP_PREFIX: &str = ".furlong-";

/// How much older than the store a temporary file must be to count as abandoned
const STALE_TEMP_AGE: Duration = Duration::from_secs(60);

/// Directory-of-files storage backend
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
    opened_at: SystemTime,
}

impl JsonDirStore {
    /// Creates a store rooted at `dir`
    ///
    /// The directory is not touched until the first save, so a store over a
    /// directory that does not exist yet simply reports no existing units.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            opened_at: SystemTime::now(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the unit for `race_id`
    pub fn unit_path(&self, race_id: &RaceId) -> PathBuf {
        self.dir.join(format!("{}.{}", race_id, EXTENSION))
    }

    /// Returns the race id a directory entry names, if it is a unit file
    fn race_id_for(path: &Path) -> Option<RaceId> {
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        match RaceId::parse(stem) {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::debug!("Ignoring non-race file in store: {}", path.display());
                None
            }
        }
    }

    /// Removes a temporary file that clearly predates this store, if `path` is one
    ///
    /// Recent files may belong to a save in progress and are left alone.
    fn sweep_if_stale(&self, path: &Path) {
        let is_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(TEMP_PREFIX));
        if !is_temp {
            return;
        }

        let modified = std::fs::metadata(path).and_then(|m| m.modified());
        let Ok(modified) = modified else {
            return;
        };
        if modified + STALE_TEMP_AGE >= self.opened_at {
            return;
        }

        match std::fs::remove_file(path) {
            Ok(()) => tracing::info!("Removed stale temporary file {}", path.display()),
            Err(e) => tracing::warn!(
                "Could not remove stale temporary file {}: {}",
                path.display(),
                e
            ),
        }
    }
}

impl RecordStore for JsonDirStore {
    fn existing_ids(&self) -> StorageResult<HashSet<RaceId>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(StorageError::io(&self.dir, e)),
        };

        let mut ids = HashSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.dir, e))?;
            let path = entry.path();
            let is_file = entry
                .file_type()
                .map_err(|e| StorageError::io(&path, e))?
                .is_file();
            if !is_file {
                continue;
            }

            self.sweep_if_stale(&path);
            if let Some(id) = Self::race_id_for(&path) {
                ids.insert(id);
            }
        }

        Ok(ids)
    }

    fn save(&mut self, race_id: &RaceId, record: &RaceRecord) -> StorageResult<()> {
        if record.is_empty() {
            return Err(StorageError::EmptyRecord(race_id.to_string()));
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;

        let body =
            serde_json::to_vec_pretty(record).map_err(|source| StorageError::Serialization {
                race_id: race_id.to_string(),
                source,
            })?;

        // Same directory as the target so the rename never crosses filesystems
        let mut tmp = Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| StorageError::io(&self.dir, e))?;
        tmp.write_all(&body)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StorageError::io(tmp.path(), e))?;

        // On failure the returned temp file is dropped, which deletes it
        let target = self.unit_path(race_id);
        tmp.persist(&target)
            .map_err(|e| StorageError::io(&target, e.error))?;

        tracing::debug!("Wrote {} rows to {}", record.len(), target.display());
        Ok(())
    }

    fn load(&self, race_id: &RaceId) -> StorageResult<RaceRecord> {
        let path = self.unit_path(race_id);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::RaceNotFound(race_id.to_string()))
            }
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        serde_json::from_slice(&content).map_err(|source| StorageError::Serialization {
            race_id: race_id.to_string(),
            source,
        })
    }

    fn load_all(&self) -> StorageResult<Vec<(RaceId, RaceRecord)>> {
        let mut ids: Vec<RaceId> = self.existing_ids()?.into_iter().collect();
        ids.sort();

        ids.into_iter()
            .map(|id| {
                let record = self.load(&id)?;
                Ok((id, record))
            })
            .collect()
    }
}

//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.
//! Every save runs in one transaction, so a race is either fully present or
//! absent.

use crate::race::{ParticipantResult, RaceId, RaceRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<ParticipantResult> {
        Ok(ParticipantResult {
            rank: row.get(0)?,
            frame_number: row.get(1)?,
            horse_number: row.get(2)?,
            horse_name: row.get(3)?,
            sex_and_age: row.get(4)?,
            weight_carried: row.get(5)?,
            jockey: row.get(6)?,
            time: row.get(7)?,
            margin: row.get(8)?,
            passing_order: row.get(9)?,
            last_3_furlongs: row.get(10)?,
            win_odds: row.get(11)?,
            popularity: row.get(12)?,
            horse_weight: row.get(13)?,
            trainer: row.get(14)?,
            owner: row.get(15)?,
            prize_money: row.get(16)?,
        })
    }
}

impl RecordStore for SqliteStore {
    fn existing_ids(&self) -> StorageResult<HashSet<RaceId>> {
        let mut stmt = self.conn.prepare("SELECT race_id FROM races")?;
        let raw: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        Ok(raw
            .iter()
            .filter_map(|s| match RaceId::parse(s) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Skipping malformed race id in database: {}", e);
                    None
                }
            })
            .collect())
    }

    fn save(&mut self, race_id: &RaceId, record: &RaceRecord) -> StorageResult<()> {
        if record.is_empty() {
            return Err(StorageError::EmptyRecord(race_id.to_string()));
        }

        let tx = self.conn.transaction()?;

        // Replacing cascades to the old participant rows
        tx.execute("DELETE FROM races WHERE race_id = ?1", params![race_id.as_str()])?;
        tx.execute(
            "INSERT INTO races (race_id, saved_at, row_count) VALUES (?1, ?2, ?3)",
            params![race_id.as_str(), Utc::now().to_rfc3339(), record.len() as i64],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO participants (
                    race_id, position, rank, frame_number, horse_number, horse_name,
                    sex_and_age, weight_carried, jockey, time, margin, passing_order,
                    last_3_furlongs, win_odds, popularity, horse_weight, trainer, owner,
                    prize_money
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            )?;

            for (position, p) in record.iter().enumerate() {
                stmt.execute(params![
                    race_id.as_str(),
                    position as i64,
                    p.rank,
                    p.frame_number,
                    p.horse_number,
                    p.horse_name,
                    p.sex_and_age,
                    p.weight_carried,
                    p.jockey,
                    p.time,
                    p.margin,
                    p.passing_order,
                    p.last_3_furlongs,
                    p.win_odds,
                    p.popularity,
                    p.horse_weight,
                    p.trainer,
                    p.owner,
                    p.prize_money,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load(&self, race_id: &RaceId) -> StorageResult<RaceRecord> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT row_count FROM races WHERE race_id = ?1",
                params![race_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        if exists.is_none() {
            return Err(StorageError::RaceNotFound(race_id.to_string()));
        }

        let mut stmt = self.conn.prepare(
            "SELECT rank, frame_number, horse_number, horse_name, sex_and_age, weight_carried,
                    jockey, time, margin, passing_order, last_3_furlongs, win_odds, popularity,
                    horse_weight, trainer, owner, prize_money
             FROM participants WHERE race_id = ?1 ORDER BY position",
        )?;

        let record = stmt
            .query_map(params![race_id.as_str()], Self::participant_from_row)?
            .collect::<Result<_, _>>()?;

        Ok(record)
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn race_id(s: &str) -> RaceId {
        RaceId::parse(s).unwrap()
    }

    fn record(ranks: &[&str]) -> RaceRecord {
        ranks
            .iter()
            .map(|rank| ParticipantResult {
                rank: rank.to_string(),
                trainer: "Trainer".to_string(),
                prize_money: "1,000.0".to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_empty_database_has_no_ids() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(store.existing_ids().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_preserves_order() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let id = race_id("202401010101");
        let rec = record(&["1", "2", "取消"]);

        store.save(&id, &rec).unwrap();

        assert_eq!(store.load(&id).unwrap(), rec);
        assert!(store.existing_ids().unwrap().contains(&id));
    }

    #[test]
    fn test_save_replaces_previous_rows() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let id = race_id("202401010101");

        store.save(&id, &record(&["1", "2", "3"])).unwrap();
        store.save(&id, &record(&["1"])).unwrap();

        assert_eq!(store.load(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_record_is_rejected() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let id = race_id("202401010101");

        assert!(matches!(
            store.save(&id, &Vec::new()),
            Err(StorageError::EmptyRecord(_))
        ));
        assert!(store.existing_ids().unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_race() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(matches!(
            store.load(&race_id("202401010101")),
            Err(StorageError::RaceNotFound(_))
        ));
    }

    #[test]
    fn test_units_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("racedata.db");

        {
            let mut store = SqliteStore::new(&path).unwrap();
            store.save(&race_id("202401010101"), &record(&["1"])).unwrap();
            store.save(&race_id("202401010102"), &record(&["1", "2"])).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, race_id("202401010101"));
        assert_eq!(all[1].1.len(), 2);
    }
}

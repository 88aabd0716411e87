//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite race store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per persisted race
CREATE TABLE IF NOT EXISTS races (
    race_id TEXT PRIMARY KEY NOT NULL,
    saved_at TEXT NOT NULL,
    row_count INTEGER NOT NULL
);

-- Result rows, in page order
CREATE TABLE IF NOT EXISTS participants (
    race_id TEXT NOT NULL REFERENCES races(race_id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    rank TEXT NOT NULL,
    frame_number TEXT NOT NULL,
    horse_number TEXT NOT NULL,
    horse_name TEXT NOT NULL,
    sex_and_age TEXT NOT NULL,
    weight_carried TEXT NOT NULL,
    jockey TEXT NOT NULL,
    time TEXT NOT NULL,
    margin TEXT NOT NULL,
    passing_order TEXT NOT NULL,
    last_3_furlongs TEXT NOT NULL,
    win_odds TEXT NOT NULL,
    popularity TEXT NOT NULL,
    horse_weight TEXT NOT NULL,
    trainer TEXT NOT NULL,
    owner TEXT NOT NULL,
    prize_money TEXT NOT NULL,
    PRIMARY KEY (race_id, position)
);

CREATE INDEX IF NOT EXISTS idx_participants_race ON participants(race_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

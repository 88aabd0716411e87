//! Race domain types
//!
//! - `RaceId`: the 12-digit identifier naming one race
//! - `DateKey`: the `YYYYMMDD` key addressing one day's listing
//! - `ParticipantResult` / `RaceRecord`: the extracted result table

mod ids;
mod record;

pub use ids::{DateKey, RaceId, RaceIdError};
pub use record::{FlatParticipantResult, ParticipantResult, RaceRecord};

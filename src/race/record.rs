use crate::race::RaceId;
use serde::{Deserialize, Serialize};

/// One participant's row of a race result table
///
/// Every field is the trimmed cell text. Nothing is coerced to a number here;
/// `rank` in particular may hold a non-numeric marker such as a withdrawal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResult {
    pub rank: String,
    pub frame_number: String,
    pub horse_number: String,
    pub horse_name: String,
    pub sex_and_age: String,
    pub weight_carried: String,
    pub jockey: String,
    pub time: String,
    pub margin: String,
    pub passing_order: String,
    #[serde(rename = "last3Furlongs")]
    pub last_3_furlongs: String,
    pub win_odds: String,
    pub popularity: String,
    /// Body weight with the change since the previous race, e.g. `480(+2)`
    pub horse_weight: String,
    pub trainer: String,
    pub owner: String,
    pub prize_money: String,
}

/// The ordered result rows of one race
///
/// An empty record means the page had no result table; it is never persisted.
pub type RaceRecord = Vec<ParticipantResult>;

/// A participant row tagged with the race it belongs to
///
/// This is the shape downstream consumers read: every persisted unit
/// flattened into one sequence with the race id injected into each row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatParticipantResult {
    pub race_id: RaceId,
    #[serde(flatten)]
    pub result: ParticipantResult,
}

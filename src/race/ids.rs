use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of digits in a race identifier
pub const RACE_ID_LEN: usize = 12;

/// Error returned when a string is not a valid race identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a 12-digit race id")]
pub struct RaceIdError(pub String);

/// Identifier of a single race, exactly twelve ASCII digits
///
/// Used as the primary key of the persisted store and as a path component
/// of the race detail URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RaceId(String);

impl RaceId {
    /// Parses a race identifier, rejecting anything but twelve digits
    pub fn parse(s: &str) -> Result<Self, RaceIdError> {
        if s.len() == RACE_ID_LEN && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(RaceIdError(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RaceId {
    type Err = RaceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RaceId {
    type Error = RaceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RaceId> for String {
    fn from(id: RaceId) -> Self {
        id.0
    }
}

/// Calendar day addressing one listing page, displayed as `YYYYMMDD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The day `days` before `today`; saturates at the earliest representable date
    pub fn days_before(today: NaiveDate, days: u32) -> Self {
        Self(
            today
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN),
        )
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

//! School-style timetables with optional A/B fortnight rotation

use burststore::now_ms;
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::keys;
use super::record::impl_record;

/// Week of a fortnightly rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Week {
    A,
    B,
}

impl std::fmt::Display for Week {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

impl std::str::FromStr for Week {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            _ => Err(format!("Unknown week: {} (use a or b)", s)),
        }
    }
}

/// A weekly (or fortnightly) schedule of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub fortnightly: bool,

    /// Any date in week A
    pub anchor_date: NaiveDate,

    #[serde(default)]
    pub blocks: Vec<TimetableBlock>,

    pub created_at: i64,
}

impl Timetable {
    pub fn new(name: impl Into<String>, anchor_date: NaiveDate) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            fortnightly: false,
            anchor_date,
            blocks: Vec::new(),
            created_at: now_ms(),
        }
    }
}

impl_record!(Timetable, keys::TIMETABLES, "timetable");

/// One recurring slot in a timetable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableBlock {
    pub day: Weekday,

    /// Restricts the block to one week of a fortnight; None means every week
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<Week>,

    pub start: NaiveTime,

    pub end: NaiveTime,

    pub subject: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

//! Calendar events

use burststore::now_ms;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::keys;
use super::record::impl_record;

/// How an event repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("Unknown recurrence: {}", s)),
        }
    }
}

/// A calendar entry in local time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,

    pub title: String,

    pub start: NaiveDateTime,

    pub end: NaiveDateTime,

    #[serde(default)]
    pub all_day: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,

    /// Last date a recurrence may fall on (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    pub created_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: generate_id(),
            title: title.into(),
            start,
            end,
            all_day: false,
            recurrence: None,
            until: None,
            color: None,
            created_at: now_ms(),
            deleted_at: None,
        }
    }
}

impl_record!(CalendarEvent, keys::EVENTS, "event");

//! Text snapshots of long-form fields

use burststore::now_ms;
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::keys;
use super::record::impl_record;

/// Copy of one text field taken before it was overwritten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBackup {
    pub id: String,

    pub entity_id: String,

    pub field: String,

    pub content: String,

    pub created_at: i64,
}

impl TextBackup {
    pub fn new(entity_id: impl Into<String>, field: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            entity_id: entity_id.into(),
            field: field.into(),
            content: content.into(),
            created_at: now_ms(),
        }
    }
}

impl_record!(TextBackup, keys::TEXT_BACKUPS, "text-backup");

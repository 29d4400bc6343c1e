//! Checklists and their items

use burststore::now_ms;
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::keys;
use super::record::{Record, impl_ordered, impl_record, next_order};

/// A named checklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub items: Vec<ListItem>,

    #[serde(default)]
    pub order: i64,

    pub created_at: i64,
}

impl TaskList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            items: Vec::new(),
            order: 0,
            created_at: now_ms(),
        }
    }

    /// Items sorted by their order field
    pub fn sorted_items(&self) -> Vec<&ListItem> {
        let mut items: Vec<&ListItem> = self.items.iter().collect();
        items.sort_by_key(|item| item.order);
        items
    }

    /// (checked, total)
    pub fn progress(&self) -> (usize, usize) {
        let checked = self.items.iter().filter(|item| item.checked).count();
        (checked, self.items.len())
    }
}

impl Record for TaskList {
    const KEY: &'static str = keys::LISTS;
    const KIND: &'static str = "list";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Place the copy last and give its items fresh ids that point at it
    fn prepare_import(&mut self, existing: &[Self]) {
        self.order = next_order(existing);
        for item in &mut self.items {
            item.id = generate_id();
            item.list_id = self.id.clone();
        }
    }
}

impl_ordered!(TaskList);

/// One line of a checklist
///
/// Live items are embedded in their list; removed items are kept on their own
/// under the deleted-items key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: String,

    pub list_id: String,

    pub text: String,

    #[serde(default)]
    pub checked: bool,

    #[serde(default)]
    pub order: i64,

    pub created_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl ListItem {
    pub fn new(list_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            list_id: list_id.into(),
            text: text.into(),
            checked: false,
            order: 0,
            created_at: now_ms(),
            deleted_at: None,
        }
    }
}

impl_record!(ListItem, keys::DELETED_LIST_ITEMS, "list-item");
impl_ordered!(ListItem);

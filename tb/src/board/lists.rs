//! Checklist operations

use burststore::{Store, now_ms};
use eyre::{Result, eyre};
use tracing::debug;

use super::collection::Collection;
use crate::domain::{IdResolver, ListItem, TaskList, next_order};

/// Checklists and their removed items
pub struct ListBoard {
    lists: Collection<TaskList>,
    deleted_items: Collection<ListItem>,
}

impl ListBoard {
    pub fn new(store: Store) -> Self {
        Self {
            lists: Collection::new(store.clone()),
            deleted_items: Collection::new(store),
        }
    }

    pub fn lists(&self) -> &Collection<TaskList> {
        &self.lists
    }

    pub fn deleted_items(&self) -> &Collection<ListItem> {
        &self.deleted_items
    }

    /// Create an empty list at the end
    pub fn create(&self, name: &str) -> Result<TaskList> {
        debug!(%name, "ListBoard::create: called");
        let mut lists = self.lists.all()?;
        let mut list = TaskList::new(name);
        list.order = next_order(&lists);
        lists.push(list.clone());
        self.lists.save_all(&lists)?;
        Ok(list)
    }

    pub fn add_item(&self, list_id: &str, text: &str) -> Result<ListItem> {
        debug!(%list_id, "ListBoard::add_item: called");
        let mut added = None;
        self.lists
            .update(list_id, |list| {
                let mut item = ListItem::new(&list.id, text);
                item.order = next_order(&list.items);
                list.items.push(item.clone());
                added = Some(item);
            })?
            .ok_or_else(|| eyre!("List not found: {}", list_id))?;
        added.ok_or_else(|| eyre!("List not found: {}", list_id))
    }

    /// Set an item's checked flag; `item_ref` may be an id prefix
    pub fn set_checked(&self, list_id: &str, item_ref: &str, checked: bool) -> Result<ListItem> {
        let list = self.lists.get(list_id)?.ok_or_else(|| eyre!("List not found: {}", list_id))?;
        let item_id = resolve_item(&list, item_ref)?;

        let mut changed = None;
        self.lists.update(list_id, |list| {
            if let Some(item) = list.items.iter_mut().find(|item| item.id == item_id) {
                item.checked = checked;
                changed = Some(item.clone());
            }
        })?;
        changed.ok_or_else(|| eyre!("Item not found: {}", item_ref))
    }

    /// Move an item out of its list into the deleted-items key
    ///
    /// The deleted-items key is written before the list, so a failed write
    /// never loses the item.
    pub fn remove_item(&self, list_id: &str, item_ref: &str) -> Result<ListItem> {
        let mut lists = self.lists.all()?;
        let mut deleted = self.deleted_items.all()?;
        let list = lists
            .iter_mut()
            .find(|list| list.id == list_id)
            .ok_or_else(|| eyre!("List not found: {}", list_id))?;
        let item_id = resolve_item(list, item_ref)?;
        let pos = list
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| eyre!("Item not found: {}", item_ref))?;

        let mut item = list.items.remove(pos);
        item.deleted_at = Some(now_ms());
        deleted.push(item.clone());
        self.deleted_items.save_all(&deleted)?;
        self.lists.save_all(&lists)?;
        Ok(item)
    }

    /// Put a deleted item back at the end of its list
    pub fn restore_item(&self, item_ref: &str) -> Result<ListItem> {
        let found = self.deleted_items.resolve(item_ref)?;
        let mut lists = self.lists.all()?;
        let mut deleted = self.deleted_items.all()?;
        let list = lists
            .iter_mut()
            .find(|list| list.id == found.list_id)
            .ok_or_else(|| eyre!("List {} no longer exists", found.list_id))?;
        let pos = deleted
            .iter()
            .position(|item| item.id == found.id)
            .ok_or_else(|| eyre!("Item not found: {}", item_ref))?;

        let mut item = deleted.remove(pos);
        item.deleted_at = None;
        item.order = next_order(&list.items);
        list.items.push(item.clone());
        self.lists.save_all(&lists)?;
        self.deleted_items.save_all(&deleted)?;
        Ok(item)
    }
}

fn resolve_item(list: &TaskList, item_ref: &str) -> Result<String> {
    let resolver = IdResolver::new(list.items.iter().map(|item| item.id.as_str()));
    match resolver.resolve(item_ref) {
        Ok(Some(id)) => Ok(id.to_string()),
        Ok(None) => Err(eyre!("No item in '{}' matches '{}'", list.name, item_ref)),
        Err(candidates) => Err(eyre!("'{}' is ambiguous: {}", item_ref, candidates.join(", "))),
    }
}

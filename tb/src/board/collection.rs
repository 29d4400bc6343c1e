//! Whole-array collections over the store

use std::marker::PhantomData;

use burststore::Store;
use eyre::{Result, eyre};
use tracing::debug;

use crate::domain::{IdResolver, Record};

/// Typed view of one array-valued key
///
/// Every operation reads the full array, changes it in memory and writes the
/// full array back.
pub struct Collection<T> {
    store: Store,
    key: String,
    _marker: PhantomData<T>,
}

impl<T: Record> Collection<T> {
    /// Collection at the record's own key
    pub fn new(store: Store) -> Self {
        Self::at(store, T::KEY)
    }

    /// Collection of `T` stored under a different key
    pub fn at(store: Store, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Every item, in stored order
    pub fn all(&self) -> burststore::Result<Vec<T>> {
        Ok(self.store.load::<Vec<T>>(&self.key)?.unwrap_or_default())
    }

    pub fn get(&self, id: &str) -> burststore::Result<Option<T>> {
        Ok(self.all()?.into_iter().find(|item| item.id() == id))
    }

    /// Find the single item whose id equals or starts with `reference`
    pub fn resolve(&self, reference: &str) -> Result<T> {
        debug!(key = %self.key, %reference, "Collection::resolve: called");
        let items = self.all()?;
        let id = {
            let resolver = IdResolver::new(items.iter().map(T::id));
            match resolver.resolve(reference) {
                Ok(Some(id)) => id.to_string(),
                Ok(None) => return Err(eyre!("No {} matches '{}'", T::KIND, reference)),
                Err(candidates) => {
                    return Err(eyre!(
                        "'{}' is ambiguous, matches {} {}s: {}",
                        reference,
                        candidates.len(),
                        T::KIND,
                        candidates.join(", ")
                    ));
                }
            }
        };
        items
            .into_iter()
            .find(|item| item.id() == id)
            .ok_or_else(|| eyre!("No {} matches '{}'", T::KIND, reference))
    }

    /// Append one item
    pub fn insert(&self, item: T) -> burststore::Result<()> {
        let mut items = self.all()?;
        items.push(item);
        self.save_all(&items)
    }

    /// Append many items, returning how many were added
    pub fn append(&self, new_items: Vec<T>) -> burststore::Result<usize> {
        let count = new_items.len();
        let mut items = self.all()?;
        items.extend(new_items);
        self.save_all(&items)?;
        Ok(count)
    }

    /// Apply `f` to the item with `id` and write the array back
    pub fn update(&self, id: &str, f: impl FnOnce(&mut T)) -> burststore::Result<Option<T>> {
        let mut items = self.all()?;
        let Some(item) = items.iter_mut().find(|item| item.id() == id) else {
            return Ok(None);
        };
        f(item);
        let updated = item.clone();
        self.save_all(&items)?;
        Ok(Some(updated))
    }

    /// Remove the item with `id`, returning it
    pub fn remove(&self, id: &str) -> burststore::Result<Option<T>> {
        let mut items = self.all()?;
        let Some(pos) = items.iter().position(|item| item.id() == id) else {
            return Ok(None);
        };
        let removed = items.remove(pos);
        self.save_all(&items)?;
        Ok(Some(removed))
    }

    /// Replace the whole array
    pub fn save_all(&self, items: &[T]) -> burststore::Result<()> {
        debug!(key = %self.key, count = items.len(), "Collection::save_all: called");
        self.store.save(&self.key, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Project, keys};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Collection<Project>) {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        (temp, Collection::new(store))
    }

    #[test]
    fn test_empty_when_missing() {
        let (_temp, projects) = setup();
        assert!(projects.all().unwrap().is_empty());
        assert_eq!(projects.key(), keys::PROJECTS);
    }

    #[test]
    fn test_insert_update_remove() {
        let (_temp, projects) = setup();
        let project = Project::new("Home");
        let id = project.id.clone();
        projects.insert(project).unwrap();

        let updated = projects.update(&id, |p| p.color = Some("red".into())).unwrap().unwrap();
        assert_eq!(updated.color.as_deref(), Some("red"));
        assert_eq!(projects.get(&id).unwrap().unwrap().color.as_deref(), Some("red"));

        assert!(projects.update("missing", |_| {}).unwrap().is_none());

        let removed = projects.remove(&id).unwrap().unwrap();
        assert_eq!(removed.name, "Home");
        assert!(projects.all().unwrap().is_empty());
    }

    #[test]
    fn test_append_keeps_existing() {
        let (_temp, projects) = setup();
        projects.insert(Project::new("a")).unwrap();
        let added = projects.append(vec![Project::new("b"), Project::new("c")]).unwrap();
        assert_eq!(added, 2);

        let names: Vec<String> = projects.all().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_resolve() {
        let (_temp, projects) = setup();
        let mut one = Project::new("one");
        one.id = "aa11".into();
        let mut two = Project::new("two");
        two.id = "aa22".into();
        projects.append(vec![one, two]).unwrap();

        assert_eq!(projects.resolve("aa1").unwrap().name, "one");
        assert!(projects.resolve("aa").is_err());
        assert!(projects.resolve("zz").is_err());
    }

    #[test]
    fn test_malformed_collection_is_an_error() {
        let (_temp, projects) = setup();
        projects.store.set_raw(keys::PROJECTS, "{oops").unwrap();
        assert!(projects.all().is_err());
    }
}

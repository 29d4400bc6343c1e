//! Core Store implementation

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

const LOCK_FILE: &str = ".lock";
const KEY_EXTENSION: &str = "json";

/// Directory-backed whole-blob JSON store
///
/// Cloning is cheap: a Store is only its base path. Clones opened on the same
/// directory (in this process or another) see each other's writes.
#[derive(Debug, Clone)]
pub struct Store {
    base_path: PathBuf,
}

impl Store {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        debug!(?base_path, "Opened store");
        Ok(Self { base_path })
    }

    /// Base directory of the store
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.{}", key, KEY_EXTENSION)))
    }

    /// Read the raw JSON text stored under a key
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the raw text stored under a key
    ///
    /// The value is written to a temp file in the store directory and renamed
    /// into place, so readers never observe a half-written blob.
    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        self.with_write_lock(|| {
            let mut tmp = tempfile::NamedTempFile::new_in(&self.base_path)?;
            tmp.write_all(value.as_bytes())?;
            tmp.flush()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })?;
        debug!(key, bytes = value.len(), "Store::set_raw: wrote key");
        Ok(())
    }

    /// Remove a key, returning whether it existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.key_path(key)?;
        let removed = self.with_write_lock(|| match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        })?;
        debug!(key, removed, "Store::remove");
        Ok(removed)
    }

    /// Whether a value is stored under the key
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.key_path(key)?.exists())
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map(|e| e != KEY_EXTENSION).unwrap_or(true) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && validate_key(stem).is_ok()
            {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Strictly load and parse a key
    ///
    /// Returns `Ok(None)` when the key is missing and an error when the stored
    /// text does not parse as `T`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|source| StoreError::Json {
                key: key.to_string(),
                source,
            }),
            None => Ok(None),
        }
    }

    /// Load a key, falling back to `default` when it is missing or malformed
    ///
    /// This never fails: I/O and parse errors are logged and degrade to the
    /// default value.
    pub fn load_or_default<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.load(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                warn!(key, error = %e, "Store::load_or_default: unreadable value, using default");
                default
            }
        }
    }

    /// Serialize and write a whole value under a key
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;
        self.set_raw(key, &raw)
    }

    fn with_write_lock<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join(LOCK_FILE))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        // Released when lock_file drops
        f()
    }
}

/// Check that a key is usable as a store file name
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        n: u32,
    }

    #[test]
    fn test_set_get_remove() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        assert_eq!(store.get_raw("alpha").unwrap(), None);
        store.set_raw("alpha", "[1,2]").unwrap();
        assert_eq!(store.get_raw("alpha").unwrap().as_deref(), Some("[1,2]"));
        assert!(store.contains("alpha").unwrap());

        assert!(store.remove("alpha").unwrap());
        assert!(!store.remove("alpha").unwrap());
        assert_eq!(store.get_raw("alpha").unwrap(), None);
    }

    #[test]
    fn test_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store");
        let store = Store::open(&path).unwrap();
        assert!(path.is_dir());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        for key in ["", ".lock", "../escape", "Upper", "has space", "a/b"] {
            assert!(
                matches!(store.set_raw(key, "1"), Err(StoreError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_keys_lists_only_json_blobs() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        store.set_raw("b-key", "1").unwrap();
        store.set_raw("a-key", "2").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.keys().unwrap(), vec!["a-key".to_string(), "b-key".to_string()]);
    }

    #[test]
    fn test_save_and_load_typed() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        let items = vec![
            Item { id: "a".into(), n: 1 },
            Item { id: "b".into(), n: 2 },
        ];
        store.save("items", &items).unwrap();

        let loaded: Option<Vec<Item>> = store.load("items").unwrap();
        assert_eq!(loaded, Some(items));
    }

    #[test]
    fn test_load_strict_reports_malformed() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        store.set_raw("items", "{not json").unwrap();
        let result: Result<Option<Vec<Item>>> = store.load("items");
        assert!(matches!(result, Err(StoreError::Json { .. })));
    }

    #[test]
    fn test_load_or_default_fails_open() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();

        // Missing
        let items: Vec<Item> = store.load_or_default("items", Vec::new());
        assert!(items.is_empty());

        // Not JSON
        store.set_raw("items", "garbage").unwrap();
        let items: Vec<Item> = store.load_or_default("items", Vec::new());
        assert!(items.is_empty());

        // JSON of the wrong shape
        store.set_raw("items", r#"{"id": 5}"#).unwrap();
        let items: Vec<Item> = store.load_or_default("items", Vec::new());
        assert!(items.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let temp = TempDir::new().unwrap();
        let a = Store::open(temp.path()).unwrap();
        let b = a.clone();

        a.save("shared", &42u32).unwrap();
        assert_eq!(b.load::<u32>("shared").unwrap(), Some(42));
    }
}

//! Whole-store ZIP bundles
//!
//! A bundle holds one `<key>.json` entry per stored key plus `manifest.json`.
//! Importing appends array values to what is already stored and replaces
//! everything else.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use burststore::{Store, now_ms, validate_key};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::error::{Result, TransferError};
use crate::domain::{
    Assessment, AssessmentType, CalendarEvent, Category, ListItem, Project, Settings, Task, TaskList, TextBackup,
    Timetable, keys,
};

pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Describes a bundle's contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub app: String,
    pub version: String,
    pub exported_at: i64,
    pub keys: Vec<String>,
}

/// Outcome for one imported key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedKey {
    pub key: String,
    /// Items appended (array keys only)
    pub added: usize,
    /// Whether a non-array value replaced the stored one
    pub replaced: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub keys: Vec<ImportedKey>,
}

impl ImportReport {
    pub fn total_added(&self) -> usize {
        self.keys.iter().map(|k| k.added).sum()
    }
}

/// Write every stored key except `exclude` into a ZIP at `path`
pub fn export_bundle(store: &Store, path: &Path, exclude: &[&str]) -> Result<Manifest> {
    debug!(?path, "export_bundle: called");
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut keys = Vec::new();
    for key in store.keys()? {
        if exclude.contains(&key.as_str()) {
            continue;
        }
        let Some(raw) = store.get_raw(&key)? else {
            continue;
        };
        zip.start_file(format!("{key}.json"), options)?;
        zip.write_all(raw.as_bytes())?;
        keys.push(key);
    }

    let manifest = Manifest {
        app: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: now_ms(),
        keys,
    };
    let manifest_json = serde_json::to_string_pretty(&manifest).map_err(|e| TransferError::WrongShape {
        name: MANIFEST_ENTRY.to_string(),
        reason: e.to_string(),
    })?;
    zip.start_file(MANIFEST_ENTRY, options)?;
    zip.write_all(manifest_json.as_bytes())?;
    zip.finish()?;

    info!(?path, keys = manifest.keys.len(), "Exported bundle");
    Ok(manifest)
}

/// Read every entry of a bundle, failing before anything is written
fn read_entries(path: &Path, exclude: &[&str]) -> Result<Vec<(String, Value)>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut entries = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if name == MANIFEST_ENTRY {
            continue;
        }
        let Some(key) = name.strip_suffix(".json").map(str::to_string) else {
            debug!(%name, "read_entries: skipping non-JSON entry");
            continue;
        };
        if exclude.contains(&key.as_str()) {
            debug!(%key, "read_entries: skipping excluded key");
            continue;
        }
        if validate_key(&key).is_err() {
            return Err(TransferError::WrongShape {
                name,
                reason: "entry name is not a store key".to_string(),
            });
        }

        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        let value: Value =
            serde_json::from_str(&text).map_err(|source| TransferError::InvalidJson { name: name.clone(), source })?;
        check_shape(&key, &value).map_err(|reason| TransferError::WrongShape { name, reason })?;
        entries.push((key, value));
    }

    Ok(entries)
}

/// Check that a value for a known application key has that key's type
///
/// Keys the application does not know are passed through unchecked.
fn check_shape(key: &str, value: &Value) -> std::result::Result<(), String> {
    match key {
        keys::TASKS | keys::DELETED_TASKS | keys::ARCHIVED_TASKS => check_items::<Task>(value),
        keys::EVENTS => check_items::<CalendarEvent>(value),
        keys::TIMETABLES => check_items::<Timetable>(value),
        keys::LISTS => check_items::<TaskList>(value),
        keys::DELETED_LIST_ITEMS => check_items::<ListItem>(value),
        keys::PROJECTS => check_items::<Project>(value),
        keys::CATEGORIES => check_items::<Category>(value),
        keys::ASSESSMENT_TYPES => check_items::<AssessmentType>(value),
        keys::ASSESSMENTS => check_items::<Assessment>(value),
        keys::TEXT_BACKUPS => check_items::<TextBackup>(value),
        keys::SETTINGS => {
            if !value.is_object() {
                return Err("expected an object".to_string());
            }
            Settings::deserialize(value).map(|_| ()).map_err(|e| e.to_string())
        }
        _ => Ok(()),
    }
}

fn check_items<T: DeserializeOwned>(value: &Value) -> std::result::Result<(), String> {
    let Value::Array(items) = value else {
        return Err("expected an array".to_string());
    };
    for (i, item) in items.iter().enumerate() {
        T::deserialize(item).map_err(|e| format!("item {i}: {e}"))?;
    }
    Ok(())
}

/// Import a bundle written by [`export_bundle`]
pub fn import_bundle(store: &Store, path: &Path, exclude: &[&str]) -> Result<ImportReport> {
    debug!(?path, "import_bundle: called");
    let entries = read_entries(path, exclude)?;

    let mut report = ImportReport::default();
    for (key, value) in entries {
        match value {
            Value::Array(items) => {
                let added = merge_items(store, &key, items)?;
                report.keys.push(ImportedKey {
                    key,
                    added,
                    replaced: false,
                });
            }
            other => {
                store.save(&key, &other)?;
                report.keys.push(ImportedKey {
                    key,
                    added: 0,
                    replaced: true,
                });
            }
        }
    }

    info!(?path, added = report.total_added(), "Imported bundle");
    Ok(report)
}

/// Append raw items to the array under `key`
///
/// A missing or non-array stored value starts from empty. Nothing is deduplicated.
pub fn merge_items(store: &Store, key: &str, items: Vec<Value>) -> Result<usize> {
    let mut existing = match store.get_raw(key)? {
        None => Vec::new(),
        Some(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(existing)) => existing,
            _ => {
                warn!(%key, "merge_items: stored value is not an array, replacing");
                Vec::new()
            }
        },
    };
    let added = items.len();
    existing.extend(items);
    store.save(key, &existing)?;
    debug!(%key, added, total = existing.len(), "merge_items: saved");
    Ok(added)
}

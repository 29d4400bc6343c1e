//! Single-entity JSON export and import

use std::fs;
use std::path::Path;

use burststore::{Store, now_ms};
use serde_json::Value;
use tracing::{debug, info};

use super::error::{Result, TransferError};
use crate::board::Collection;
use crate::domain::{Record, generate_id};

/// Fields replaced with fresh values on import
pub const STRIPPED_FIELDS: &[&str] = &["id", "createdAt"];

/// Suggested file name for an exported entity
pub fn default_file_name(kind: &str, id: &str) -> String {
    format!("{kind}-{id}.json")
}

/// Write one entity as a pretty-printed JSON object
pub fn export_entity<T: Record>(entity: &T, path: &Path) -> Result<()> {
    debug!(kind = T::KIND, id = entity.id(), ?path, "export_entity: called");
    let json = serde_json::to_string_pretty(entity).map_err(|e| TransferError::WrongShape {
        name: T::KIND.to_string(),
        reason: e.to_string(),
    })?;
    fs::write(path, json)?;
    Ok(())
}

/// Parse an exported entity, giving it a fresh id and creation time
///
/// `name` labels the input in error messages.
pub fn parse_entity<T: Record>(text: &str, name: &str) -> Result<T> {
    let value: Value = serde_json::from_str(text).map_err(|source| TransferError::InvalidJson {
        name: name.to_string(),
        source,
    })?;

    let Value::Object(mut fields) = value else {
        return Err(TransferError::WrongShape {
            name: name.to_string(),
            reason: format!("expected a {} object", T::KIND),
        });
    };
    for field in STRIPPED_FIELDS {
        fields.remove(*field);
    }
    fields.insert("id".into(), Value::String(generate_id()));
    fields.insert("createdAt".into(), Value::from(now_ms()));

    serde_json::from_value(Value::Object(fields)).map_err(|e| TransferError::WrongShape {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Read an exported entity file without touching the store
pub fn read_entity<T: Record>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    parse_entity(&text, &path.display().to_string())
}

/// Read an exported entity file and append it to its collection
pub fn import_entity<T: Record>(store: &Store, path: &Path) -> Result<T> {
    debug!(kind = T::KIND, ?path, "import_entity: called");
    let mut entity: T = read_entity(path)?;
    let collection = Collection::<T>::new(store.clone());
    let mut items = collection.all()?;
    entity.prepare_import(&items);
    items.push(entity.clone());
    collection.save_all(&items)?;
    info!(kind = T::KIND, id = entity.id(), "Imported entity");
    Ok(entity)
}

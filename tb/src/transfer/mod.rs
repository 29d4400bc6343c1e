//! Export and import
//!
//! Single entities travel as one JSON object per file. The whole store travels
//! as a ZIP bundle. Both import paths parse everything before they write, so a
//! rejected file leaves stored data unchanged.

mod bundle;
mod entity;
mod error;

pub use bundle::{ImportReport, ImportedKey, MANIFEST_ENTRY, Manifest, export_bundle, import_bundle, merge_items};
pub use entity::{STRIPPED_FIELDS, default_file_name, export_entity, import_entity, parse_entity, read_entity};
pub use error::{Result, TransferError};

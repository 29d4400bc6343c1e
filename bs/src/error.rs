//! Store errors

use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in key {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid key: {0:?} (allowed: a-z, 0-9, '.', '_', '-')")]
    InvalidKey(String),

    #[error("Failed to lock store: {0}")]
    Lock(String),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

//! Error types for export and import

use thiserror::Error;

/// Errors from reading or writing export files
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{name} is not valid JSON: {source}")]
    InvalidJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{name} has the wrong shape: {reason}")]
    WrongShape { name: String, reason: String },

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Store error: {0}")]
    Store(#[from] burststore::StoreError),
}

pub type Result<T> = std::result::Result<T, TransferError>;

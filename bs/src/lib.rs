//! BurstStore - whole-blob JSON key-value store
//!
//! Every key holds one JSON document that is read and written as a whole.
//! There is no partial-update API: callers read the full value, change it in
//! memory and write the full value back.
//!
//! # Layout
//!
//! ```text
//! store/
//! ├── .lock                       # fs2 exclusive lock held during writes
//! ├── taskburst-tasks.json
//! ├── taskburst-settings.json
//! └── taskburst-heartbeat.json
//! ```
//!
//! # Example
//!
//! ```ignore
//! use burststore::Store;
//!
//! let store = Store::open("store")?;
//! store.save("taskburst-tasks", &vec!["a", "b"])?;
//! let tasks: Vec<String> = store.load_or_default("taskburst-tasks", Vec::new());
//! ```

mod error;
mod store;
mod watch;

pub use error::{Result, StoreError};
pub use store::{Store, validate_key};
pub use watch::{DEFAULT_WATCH_INTERVAL, KeyWatcher, StorageChange};

/// Current time as unix milliseconds
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

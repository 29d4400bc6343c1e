//! Polling change notification for a single key
//!
//! Another process writing the store directory cannot push events into this
//! one, so the watcher reads the key on a short interval and reports each
//! change in content. Writes made by this process are reported too; consumers
//! filter on the value.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::Store;

/// Default interval between reads of the watched key
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(250);

/// A change observed on a watched key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Key that changed
    pub key: String,
    /// Raw value before the change (None if absent)
    pub old_value: Option<String>,
    /// Raw value after the change (None if removed)
    pub new_value: Option<String>,
}

/// Watches one key and reports content changes on a channel
pub struct KeyWatcher {
    store: Store,
    key: String,
    interval: Duration,
}

impl KeyWatcher {
    /// Create a watcher for `key` polling at `interval`
    pub fn new(store: Store, key: impl Into<String>, interval: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            interval,
        }
    }

    /// Start watching
    ///
    /// The value present at spawn time is the baseline and is not reported.
    /// The task exits once the returned receiver is dropped.
    pub fn spawn(self) -> (mpsc::Receiver<StorageChange>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(32);
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    async fn run(self, tx: mpsc::Sender<StorageChange>) {
        debug!(key = %self.key, interval_ms = self.interval.as_millis() as u64, "KeyWatcher: started");
        let mut last = self.read();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }

            let current = self.read();
            if current == last {
                continue;
            }

            let change = StorageChange {
                key: self.key.clone(),
                old_value: last.take(),
                new_value: current.clone(),
            };
            last = current;

            if tx.send(change).await.is_err() {
                break;
            }
        }
        debug!(key = %self.key, "KeyWatcher: stopped");
    }

    fn read(&self) -> Option<String> {
        match self.store.get_raw(&self.key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %self.key, error = %e, "KeyWatcher: read failed, treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reports_write_and_removal() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        store.set_raw("watched", "1").unwrap();

        let (mut rx, handle) = KeyWatcher::new(store.clone(), "watched", Duration::from_millis(10)).spawn();

        tokio::time::sleep(Duration::from_millis(30)).await;
        store.set_raw("watched", "2").unwrap();

        let change = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.key, "watched");
        assert_eq!(change.old_value.as_deref(), Some("1"));
        assert_eq!(change.new_value.as_deref(), Some("2"));

        store.remove("watched").unwrap();
        let change = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.old_value.as_deref(), Some("2"));
        assert_eq!(change.new_value, None);

        drop(rx);
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unchanged_key_is_quiet() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        store.set_raw("quiet", "same").unwrap();

        let (mut rx, _handle) = KeyWatcher::new(store.clone(), "quiet", Duration::from_millis(10)).spawn();

        store.set_raw("quiet", "same").unwrap();
        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err(), "no change should be reported");
    }
}

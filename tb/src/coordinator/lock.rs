//! Heartbeat-based instance lock
//!
//! The lock is a single record `{ id, timestamp }` in the shared store. An
//! instance holds it while its heartbeat is younger than the timeout; nothing
//! else enforces exclusion.
//!
//! # Known race
//!
//! Two instances mounting at the same moment can both read "no live
//! heartbeat" and both become Active. Each then rewrites the record on its own
//! interval, so the stored owner flips between them until one notices the
//! other's write through the storage-change path. This is a best-effort lock,
//! not consensus: there is no tie-break on identity or start time, and
//! `release` checks ownership and deletes in two separate steps.

use burststore::Store;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::identity::InstanceId;

/// Liveness record written by the Active instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Owning instance id
    pub id: String,
    /// Last liveness confirmation (unix ms)
    pub timestamp: i64,
}

impl Heartbeat {
    pub fn new(id: &InstanceId, now: i64) -> Self {
        Self {
            id: id.as_str().to_string(),
            timestamp: now,
        }
    }

    /// Parse a raw stored value; anything unparsable counts as no heartbeat
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn age_ms(&self, now: i64) -> i64 {
        now - self.timestamp
    }

    pub fn is_live(&self, now: i64, timeout_ms: i64) -> bool {
        self.age_ms(now) < timeout_ms
    }

    pub fn belongs_to(&self, id: &InstanceId) -> bool {
        self.id == id.as_str()
    }
}

/// Shared coordination resource guarding the single-active-instance invariant
pub trait InstanceLock {
    /// Staleness timeout in milliseconds
    fn timeout_ms(&self) -> i64;

    /// Current record; absent and malformed values both read as None
    fn holder(&self) -> Option<Heartbeat>;

    /// Write our heartbeat unconditionally
    fn renew(&self, id: &InstanceId, now: i64) -> burststore::Result<()>;

    /// Remove the record if we still own it; returns whether it was removed
    fn release(&self, id: &InstanceId) -> burststore::Result<bool>;

    /// Whether a live heartbeat from some other instance is present
    fn is_held(&self, by_other_than: &InstanceId, now: i64) -> bool {
        self.holder()
            .is_some_and(|hb| !hb.belongs_to(by_other_than) && hb.is_live(now, self.timeout_ms()))
    }

    /// Write our heartbeat unless another instance holds a live one
    fn try_acquire(&self, id: &InstanceId, now: i64) -> burststore::Result<bool> {
        if self.is_held(id, now) {
            return Ok(false);
        }
        self.renew(id, now)?;
        Ok(true)
    }
}

/// InstanceLock stored under one key of a [`Store`]
#[derive(Debug, Clone)]
pub struct HeartbeatLock {
    store: Store,
    key: String,
    timeout_ms: i64,
}

impl HeartbeatLock {
    pub fn new(store: Store, key: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            store,
            key: key.into(),
            timeout_ms: i64::try_from(timeout_ms).unwrap_or(i64::MAX),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl InstanceLock for HeartbeatLock {
    fn timeout_ms(&self) -> i64 {
        self.timeout_ms
    }

    fn holder(&self) -> Option<Heartbeat> {
        self.store.load_or_default::<Option<Heartbeat>>(&self.key, None)
    }

    fn renew(&self, id: &InstanceId, now: i64) -> burststore::Result<()> {
        self.store.save(&self.key, &Heartbeat::new(id, now))
    }

    fn release(&self, id: &InstanceId) -> burststore::Result<bool> {
        match self.holder() {
            Some(hb) if hb.belongs_to(id) => {
                self.store.remove(&self.key)?;
                debug!(%id, "HeartbeatLock::release: removed own heartbeat");
                Ok(true)
            }
            other => {
                debug!(%id, holder = ?other.map(|hb| hb.id), "HeartbeatLock::release: not owner, leaving record");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "taskburst-heartbeat";

    fn setup() -> (TempDir, HeartbeatLock) {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        (temp, HeartbeatLock::new(store, KEY, 5000))
    }

    #[test]
    fn test_liveness_boundary() {
        let hb = Heartbeat {
            id: "a".into(),
            timestamp: 10_000,
        };
        assert!(hb.is_live(14_999, 5000));
        assert!(!hb.is_live(15_000, 5000));
        assert_eq!(hb.age_ms(16_000), 6000);
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let lock = HeartbeatLock::new(store, KEY, u64::MAX);
        assert_eq!(lock.timeout_ms(), i64::MAX);

        let other = InstanceId::from_string("other");
        lock.renew(&other, 0).unwrap();
        assert!(lock.is_held(&InstanceId::from_string("me"), 1_000_000));
    }

    #[test]
    fn test_parse_rejects_garbage_and_wrong_shape() {
        assert!(Heartbeat::parse("not json").is_none());
        assert!(Heartbeat::parse(r#"{"id": 5}"#).is_none());
        assert!(Heartbeat::parse(r#"{"id":"a","timestamp":"yesterday"}"#).is_none());
        assert_eq!(
            Heartbeat::parse(r#"{"id":"a","timestamp":1}"#),
            Some(Heartbeat {
                id: "a".into(),
                timestamp: 1
            })
        );
    }

    #[test]
    fn test_acquire_on_empty_store() {
        let (_temp, lock) = setup();
        let me = InstanceId::from_string("me");

        assert!(lock.holder().is_none());
        assert!(lock.try_acquire(&me, 1000).unwrap());
        assert_eq!(lock.holder(), Some(Heartbeat::new(&me, 1000)));
    }

    #[test]
    fn test_acquire_refused_while_other_live() {
        let (_temp, lock) = setup();
        let a = InstanceId::from_string("a");
        let b = InstanceId::from_string("b");

        lock.renew(&a, 1000).unwrap();
        assert!(lock.is_held(&b, 2000));
        assert!(!lock.try_acquire(&b, 2000).unwrap());
        assert!(lock.holder().unwrap().belongs_to(&a));

        // Stale after the timeout
        assert!(lock.try_acquire(&b, 7000).unwrap());
        assert!(lock.holder().unwrap().belongs_to(&b));
    }

    #[test]
    fn test_own_heartbeat_is_not_held_against_us() {
        let (_temp, lock) = setup();
        let me = InstanceId::from_string("me");
        lock.renew(&me, 1000).unwrap();
        assert!(!lock.is_held(&me, 1001));
    }

    #[test]
    fn test_malformed_record_reads_as_absent() {
        let (_temp, lock) = setup();
        lock.store().set_raw(KEY, "{{{{").unwrap();
        assert!(lock.holder().is_none());
        assert!(!lock.is_held(&InstanceId::from_string("x"), 0));
    }

    #[test]
    fn test_release_only_when_owner() {
        let (_temp, lock) = setup();
        let a = InstanceId::from_string("a");
        let b = InstanceId::from_string("b");

        lock.renew(&a, 1000).unwrap();
        assert!(!lock.release(&b).unwrap());
        assert!(lock.holder().is_some());

        assert!(lock.release(&a).unwrap());
        assert!(lock.holder().is_none());
        assert!(!lock.release(&a).unwrap());
    }
}

//! Instance coordination state machine
//!
//! Pure and synchronous: every input carries `now`, and the machine performs
//! its own lock reads and writes. Timers and channels live in the runner.
//! Lock errors never escape: they are logged and the machine keeps the state
//! that leaves the host usable.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::presence::PresenceMessage;

use super::identity::InstanceId;
use super::lock::{Heartbeat, InstanceLock};

/// Coordination state of this instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// Mounted, no decision yet
    #[default]
    Starting,
    /// Another instance holds a live heartbeat
    Blocked,
    /// This instance owns the heartbeat
    Active,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Blocked => write!(f, "blocked"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Single-instance coordinator over an [`InstanceLock`]
pub struct InstanceCoordinator<L: InstanceLock> {
    id: InstanceId,
    lock: L,
    state: InstanceState,
}

impl<L: InstanceLock> InstanceCoordinator<L> {
    pub fn new(id: InstanceId, lock: L) -> Self {
        Self {
            id,
            lock,
            state: InstanceState::Starting,
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn lock(&self) -> &L {
        &self.lock
    }

    /// Mount-time check: block behind a live foreign heartbeat, else become Active
    pub fn mount(&mut self, now: i64) -> InstanceState {
        debug!(id = %self.id, "InstanceCoordinator::mount: called");
        if self.lock.is_held(&self.id, now) {
            self.enter_blocked();
        } else {
            self.enter_active(now);
        }
        self.state
    }

    /// Manual retry from the blocked notice; re-runs the mount check
    pub fn retry(&mut self, now: i64) -> InstanceState {
        if self.state == InstanceState::Active {
            return self.state;
        }
        self.mount(now)
    }

    /// Blocked-state poll: take over once the record is absent, ours, or stale
    pub fn poll(&mut self, now: i64) -> InstanceState {
        if self.state == InstanceState::Blocked && !self.lock.is_held(&self.id, now) {
            debug!(id = %self.id, "InstanceCoordinator::poll: holder gone");
            self.enter_active(now);
        }
        self.state
    }

    /// Active-state heartbeat write
    pub fn heartbeat(&mut self, now: i64) -> InstanceState {
        if self.state == InstanceState::Active
            && let Err(e) = self.lock.renew(&self.id, now)
        {
            warn!(id = %self.id, error = %e, "Heartbeat write failed");
        }
        self.state
    }

    /// The heartbeat key changed in storage
    ///
    /// Any parsable foreign heartbeat pre-empts this instance. Deletions,
    /// garbage and our own writes are ignored.
    pub fn on_storage_change(&mut self, new_value: Option<&str>) -> InstanceState {
        if self.state != InstanceState::Active {
            return self.state;
        }
        if let Some(hb) = new_value.and_then(Heartbeat::parse)
            && !hb.belongs_to(&self.id)
        {
            info!(id = %self.id, other = %hb.id, "Another instance wrote the heartbeat");
            self.enter_blocked();
        }
        self.state
    }

    /// React to a presence message, returning a reply to broadcast if any
    ///
    /// Messages only prompt a re-check of the stored record; the record
    /// decides.
    pub fn on_presence(&mut self, msg: &PresenceMessage, now: i64) -> Option<PresenceMessage> {
        if msg.sender() == self.id.as_str() {
            return None;
        }
        debug!(id = %self.id, kind = msg.kind(), from = msg.sender(), "InstanceCoordinator::on_presence");

        match msg {
            PresenceMessage::Ping { .. } => (self.state == InstanceState::Active).then(|| PresenceMessage::Pong {
                id: self.id.as_str().to_string(),
            }),
            PresenceMessage::Pong { .. } | PresenceMessage::NewInstance { .. } => {
                if self.state != InstanceState::Blocked && self.lock.is_held(&self.id, now) {
                    self.enter_blocked();
                }
                None
            }
        }
    }

    /// Teardown: release the record if we still own it
    pub fn unmount(&mut self) -> bool {
        let was_active = self.state == InstanceState::Active;
        self.state = InstanceState::Starting;
        if !was_active {
            return false;
        }
        match self.lock.release(&self.id) {
            Ok(released) => {
                info!(id = %self.id, released, "Instance unmounted");
                released
            }
            Err(e) => {
                warn!(id = %self.id, error = %e, "Failed to release heartbeat");
                false
            }
        }
    }

    fn enter_blocked(&mut self) {
        if self.state != InstanceState::Blocked {
            info!(id = %self.id, from = %self.state, "Instance blocked by another active instance");
        }
        self.state = InstanceState::Blocked;
    }

    fn enter_active(&mut self, now: i64) {
        if let Err(e) = self.lock.renew(&self.id, now) {
            warn!(id = %self.id, error = %e, "Heartbeat write failed on activation");
        }
        if self.state != InstanceState::Active {
            info!(id = %self.id, from = %self.state, "Instance active");
        }
        self.state = InstanceState::Active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::lock::HeartbeatLock;
    use burststore::Store;
    use tempfile::TempDir;

    const KEY: &str = "taskburst-heartbeat";
    const TIMEOUT: u64 = 5000;

    fn coordinator(store: &Store, id: &str) -> InstanceCoordinator<HeartbeatLock> {
        InstanceCoordinator::new(
            InstanceId::from_string(id),
            HeartbeatLock::new(store.clone(), KEY, TIMEOUT),
        )
    }

    fn write_heartbeat(store: &Store, id: &str, timestamp: i64) {
        store
            .save(
                KEY,
                &Heartbeat {
                    id: id.to_string(),
                    timestamp,
                },
            )
            .unwrap();
    }

    fn stored(store: &Store) -> Option<Heartbeat> {
        store.load(KEY).unwrap()
    }

    #[test]
    fn test_single_starter_becomes_active_and_writes() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let mut a = coordinator(&store, "a");

        assert_eq!(a.state(), InstanceState::Starting);
        assert_eq!(a.mount(10_000), InstanceState::Active);
        assert_eq!(
            stored(&store),
            Some(Heartbeat {
                id: "a".into(),
                timestamp: 10_000
            })
        );
    }

    #[test]
    fn test_second_instance_blocks() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        write_heartbeat(&store, "a", 10_000);

        let mut b = coordinator(&store, "b");
        assert_eq!(b.mount(11_000), InstanceState::Blocked);
        // B never touched the record
        assert_eq!(stored(&store).unwrap().id, "a");
    }

    #[test]
    fn test_stale_heartbeat_is_ignored() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        write_heartbeat(&store, "a", 10_000);

        let mut b = coordinator(&store, "b");
        assert_eq!(b.mount(16_000), InstanceState::Active);
        assert_eq!(stored(&store).unwrap().id, "b");
    }

    #[test]
    fn test_malformed_heartbeat_fails_open() {
        for raw in ["garbage", "[]", r#"{"id":"a"}"#, r#"{"owner":"a","timestamp":1}"#] {
            let temp = TempDir::new().unwrap();
            let store = Store::open(temp.path()).unwrap();
            store.set_raw(KEY, raw).unwrap();

            let mut b = coordinator(&store, "b");
            assert_eq!(b.mount(1000), InstanceState::Active, "raw {raw:?}");
        }
    }

    #[test]
    fn test_blocked_poll_takes_over_after_release() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let mut a = coordinator(&store, "a");
        let mut b = coordinator(&store, "b");

        assert_eq!(a.mount(1000), InstanceState::Active);
        assert_eq!(b.mount(1100), InstanceState::Blocked);

        // Still held on the next poll
        assert_eq!(b.poll(2000), InstanceState::Blocked);

        assert!(a.unmount());
        assert!(stored(&store).is_none());

        assert_eq!(b.poll(3100), InstanceState::Active);
        assert_eq!(stored(&store).unwrap().id, "b");
    }

    #[test]
    fn test_blocked_poll_takes_over_after_crash() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let mut a = coordinator(&store, "a");
        let mut b = coordinator(&store, "b");

        a.mount(1000);
        b.mount(1500);
        // A never unmounts: its record goes stale
        assert_eq!(b.poll(5999), InstanceState::Blocked);
        assert_eq!(b.poll(6000), InstanceState::Active);
    }

    #[test]
    fn test_unmount_leaves_foreign_record() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let mut a = coordinator(&store, "a");

        a.mount(1000);
        // Lost the race: someone else overwrote the record
        write_heartbeat(&store, "b", 1200);

        assert!(!a.unmount());
        assert_eq!(stored(&store).unwrap().id, "b");
    }

    #[test]
    fn test_unmount_when_blocked_is_noop() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        write_heartbeat(&store, "a", 1000);

        let mut b = coordinator(&store, "b");
        b.mount(1100);
        assert!(!b.unmount());
        assert_eq!(stored(&store).unwrap().id, "a");
    }

    #[test]
    fn test_heartbeat_refreshes_timestamp() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let mut a = coordinator(&store, "a");

        a.mount(1000);
        a.heartbeat(3000);
        assert_eq!(stored(&store).unwrap().timestamp, 3000);
    }

    #[test]
    fn test_storage_change_preempts_active() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let mut a = coordinator(&store, "a");
        a.mount(1000);

        // Own write and deletions are ignored
        assert_eq!(
            a.on_storage_change(Some(r#"{"id":"a","timestamp":1000}"#)),
            InstanceState::Active
        );
        assert_eq!(a.on_storage_change(None), InstanceState::Active);
        assert_eq!(a.on_storage_change(Some("garbage")), InstanceState::Active);

        assert_eq!(
            a.on_storage_change(Some(r#"{"id":"b","timestamp":1001}"#)),
            InstanceState::Blocked
        );
    }

    #[test]
    fn test_simultaneous_start_race_is_best_effort() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let mut a = coordinator(&store, "a");
        let mut b = coordinator(&store, "b");

        // Both read "no live heartbeat" before either writes
        assert!(!a.lock().is_held(a.id(), 1000));
        assert!(!b.lock().is_held(b.id(), 1000));
        a.mount(1000);
        // B's check already passed; model its write landing afterwards
        b.enter_active(1000);

        assert_eq!(a.state(), InstanceState::Active);
        assert_eq!(b.state(), InstanceState::Active);
        // Later physical write wins in storage
        assert_eq!(stored(&store).unwrap().id, "b");
    }

    #[test]
    fn test_retry_rechecks() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        write_heartbeat(&store, "a", 1000);

        let mut b = coordinator(&store, "b");
        assert_eq!(b.mount(1100), InstanceState::Blocked);
        assert_eq!(b.retry(1200), InstanceState::Blocked);

        store.remove(KEY).unwrap();
        assert_eq!(b.retry(1300), InstanceState::Active);
        assert_eq!(b.retry(1400), InstanceState::Active);
    }

    #[test]
    fn test_presence_ping_answered_only_when_active() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let mut a = coordinator(&store, "a");
        let ping = PresenceMessage::Ping { id: "b".into() };

        assert_eq!(a.on_presence(&ping, 900), None);
        a.mount(1000);
        assert_eq!(a.on_presence(&ping, 1100), Some(PresenceMessage::Pong { id: "a".into() }));

        // Own messages are ignored
        assert_eq!(a.on_presence(&PresenceMessage::Ping { id: "a".into() }, 1100), None);
    }

    #[test]
    fn test_presence_new_instance_rechecks_storage() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let mut a = coordinator(&store, "a");
        a.mount(1000);

        let announce = PresenceMessage::NewInstance { id: "b".into() };

        // Announcement alone does not block while the record is ours
        a.on_presence(&announce, 1100);
        assert_eq!(a.state(), InstanceState::Active);

        write_heartbeat(&store, "b", 1150);
        a.on_presence(&announce, 1200);
        assert_eq!(a.state(), InstanceState::Blocked);
    }
}

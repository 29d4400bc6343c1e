//! One-shot instance session for short-lived commands
//!
//! A command that mutates the store mounts, does its work and unmounts
//! without running timers. It refuses to start while another instance holds
//! a live heartbeat.

use burststore::{Store, now_ms};
use thiserror::Error;
use tracing::debug;

use super::config::CoordinatorConfig;
use super::identity::InstanceId;
use super::lock::{HeartbeatLock, InstanceLock};
use super::machine::{InstanceCoordinator, InstanceState};

/// Errors from acquiring a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Another TaskBurst instance is active ({holder}, last heartbeat {age_ms} ms ago)")]
    InstanceBusy { holder: String, age_ms: i64 },
}

/// Active mount held for the duration of one command
///
/// Dropping the session releases the heartbeat if it is still ours.
pub struct InstanceSession {
    machine: InstanceCoordinator<HeartbeatLock>,
}

impl InstanceSession {
    /// Mount once; fail with `InstanceBusy` instead of blocking
    pub fn acquire(store: &Store, config: &CoordinatorConfig) -> Result<Self, SessionError> {
        let lock = HeartbeatLock::new(store.clone(), config.heartbeat_key.clone(), config.heartbeat_timeout_ms);
        let mut machine = InstanceCoordinator::new(InstanceId::generate(), lock);
        let now = now_ms();

        if machine.mount(now) == InstanceState::Blocked {
            let (holder, age_ms) = machine
                .lock()
                .holder()
                .map(|hb| (hb.id.clone(), hb.age_ms(now)))
                .unwrap_or_default();
            return Err(SessionError::InstanceBusy { holder, age_ms });
        }

        debug!(id = %machine.id(), "InstanceSession::acquire: active");
        Ok(Self { machine })
    }

    pub fn id(&self) -> &InstanceId {
        self.machine.id()
    }

    /// Unmount now, returning whether the heartbeat was removed
    pub fn release(mut self) -> bool {
        self.machine.unmount()
    }
}

impl Drop for InstanceSession {
    fn drop(&mut self) {
        self.machine.unmount();
    }
}

/// Run `f` inside an [`InstanceSession`]
pub fn with_instance<R>(
    store: &Store,
    config: &CoordinatorConfig,
    f: impl FnOnce() -> eyre::Result<R>,
) -> eyre::Result<R> {
    let session = InstanceSession::acquire(store, config)?;
    let result = f();
    session.release();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::lock::Heartbeat;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let config = CoordinatorConfig::default();

        let session = InstanceSession::acquire(&store, &config).unwrap();
        let stored: Heartbeat = store.load(&config.heartbeat_key).unwrap().unwrap();
        assert!(stored.belongs_to(session.id()));

        assert!(session.release());
        assert!(!store.contains(&config.heartbeat_key).unwrap());
    }

    #[test]
    fn test_drop_releases() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let config = CoordinatorConfig::default();

        {
            let _session = InstanceSession::acquire(&store, &config).unwrap();
            assert!(store.contains(&config.heartbeat_key).unwrap());
        }
        assert!(!store.contains(&config.heartbeat_key).unwrap());
    }

    #[test]
    fn test_busy_when_other_live() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let config = CoordinatorConfig::default();
        store
            .save(
                &config.heartbeat_key,
                &Heartbeat {
                    id: "other".into(),
                    timestamp: now_ms(),
                },
            )
            .unwrap();

        match InstanceSession::acquire(&store, &config) {
            Err(SessionError::InstanceBusy { holder, .. }) => assert_eq!(holder, "other"),
            Ok(_) => panic!("expected InstanceBusy"),
        }
        // Record untouched
        let stored: Heartbeat = store.load(&config.heartbeat_key).unwrap().unwrap();
        assert_eq!(stored.id, "other");
    }

    #[test]
    fn test_with_instance_runs_closure() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let config = CoordinatorConfig::default();

        let value = with_instance(&store, &config, || Ok(7)).unwrap();
        assert_eq!(value, 7);
        assert!(!store.contains(&config.heartbeat_key).unwrap());
    }
}

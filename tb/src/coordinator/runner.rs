//! CoordinatorRunner - drives the state machine on the tokio runtime
//!
//! Feeds the machine from independent sources: the heartbeat and poll
//! timers, the storage watcher, the optional presence channel and requests
//! from handles. Each timer only ticks in the state that needs it and restarts
//! its period when that state is entered.

use burststore::{KeyWatcher, Store, now_ms};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::presence::{PresenceChannel, PresenceMessage, PresenceSender};

use super::config::CoordinatorConfig;
use super::handle::CoordinatorHandle;
use super::identity::InstanceId;
use super::lock::{HeartbeatLock, InstanceLock};
use super::machine::{InstanceCoordinator, InstanceState};
use super::messages::{InstanceRequest, InstanceStatus};

/// Owns the coordinator for one instance until teardown
pub struct CoordinatorRunner {
    config: CoordinatorConfig,
    store: Store,
    machine: InstanceCoordinator<HeartbeatLock>,
    tx: mpsc::Sender<InstanceRequest>,
    rx: mpsc::Receiver<InstanceRequest>,
    state_tx: watch::Sender<InstanceState>,
}

impl CoordinatorRunner {
    /// Create a runner with a freshly generated instance id
    pub fn new(config: CoordinatorConfig, store: Store) -> Self {
        Self::with_id(config, store, InstanceId::generate())
    }

    /// Create a runner with a specific instance id
    pub fn with_id(config: CoordinatorConfig, store: Store, id: InstanceId) -> Self {
        let lock = HeartbeatLock::new(store.clone(), config.heartbeat_key.clone(), config.heartbeat_timeout_ms);
        let (tx, rx) = mpsc::channel(16);
        let (state_tx, _) = watch::channel(InstanceState::Starting);
        Self {
            config,
            store,
            machine: InstanceCoordinator::new(id, lock),
            tx,
            rx,
            state_tx,
        }
    }

    pub fn id(&self) -> &InstanceId {
        self.machine.id()
    }

    /// Create a handle for controlling the runner
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(self.tx.clone(), self.state_tx.subscribe(), self.machine.id().clone())
    }

    /// Mount and run until shutdown is requested or every handle drops
    pub async fn run(self) {
        let Self {
            config,
            store,
            machine,
            tx,
            mut rx,
            state_tx,
        } = self;
        drop(tx);

        let id = machine.id().clone();
        info!(%id, "Coordinator starting");

        let (mut changes, watcher) =
            KeyWatcher::new(store, config.heartbeat_key.clone(), config.watch_interval()).spawn();

        let mut presence = if config.presence {
            match PresenceChannel::open(&config.presence_dir(), id.as_str()) {
                Ok(channel) => Some(channel),
                Err(e) => {
                    warn!(error = %e, "Presence channel unavailable, relying on storage polling");
                    None
                }
            }
        } else {
            debug!("Presence channel disabled by config");
            None
        };

        let mut driver = Driver {
            machine,
            state_tx,
            sender: presence.as_ref().map(|channel| channel.sender()),
            heartbeat: delayed_interval(config.heartbeat_interval()),
            poll: delayed_interval(config.poll_interval()),
        };

        driver.announce(PresenceMessage::Ping {
            id: id.as_str().to_string(),
        });
        driver.machine.mount(now_ms());
        driver.settle(InstanceState::Starting);

        loop {
            let prev = driver.machine.state();
            tokio::select! {
                _ = driver.heartbeat.tick(), if prev == InstanceState::Active => {
                    driver.machine.heartbeat(now_ms());
                }
                _ = driver.poll.tick(), if prev == InstanceState::Blocked => {
                    driver.machine.poll(now_ms());
                }
                Some(change) = changes.recv() => {
                    debug!(key = %change.key, "Coordinator: heartbeat key changed");
                    driver.machine.on_storage_change(change.new_value.as_deref());
                }
                Some(msg) = recv_presence(&mut presence) => {
                    if let Some(reply) = driver.machine.on_presence(&msg, now_ms()) {
                        driver.announce(reply);
                    }
                }
                req = rx.recv() => match req {
                    Some(InstanceRequest::Retry { reply }) => {
                        let state = driver.machine.retry(now_ms());
                        let _ = reply.send(state);
                    }
                    Some(InstanceRequest::GetStatus { reply }) => {
                        let _ = reply.send(InstanceStatus {
                            id: id.as_str().to_string(),
                            state: driver.machine.state(),
                            holder: driver.machine.lock().holder(),
                            presence_enabled: presence.is_some(),
                        });
                    }
                    Some(InstanceRequest::Shutdown) | None => {
                        debug!("Coordinator: teardown requested");
                        break;
                    }
                },
            }
            driver.settle(prev);
        }

        driver.machine.unmount();
        driver.state_tx.send_replace(InstanceState::Starting);
        if let Some(channel) = presence {
            channel.close();
        }
        drop(changes);
        watcher.abort();
        info!(%id, "Coordinator stopped");
    }
}

/// Mutable loop state shared by the select branches
struct Driver {
    machine: InstanceCoordinator<HeartbeatLock>,
    state_tx: watch::Sender<InstanceState>,
    sender: Option<PresenceSender>,
    heartbeat: Interval,
    poll: Interval,
}

impl Driver {
    /// Publish a state change and restart the timer the new state uses
    fn settle(&mut self, prev: InstanceState) {
        let state = self.machine.state();
        if state == prev {
            return;
        }
        debug!(%prev, %state, "Coordinator: transition");
        self.state_tx.send_replace(state);
        match state {
            InstanceState::Active => {
                self.heartbeat.reset();
                self.announce(PresenceMessage::NewInstance {
                    id: self.machine.id().as_str().to_string(),
                });
            }
            InstanceState::Blocked => self.poll.reset(),
            InstanceState::Starting => {}
        }
    }

    fn announce(&self, msg: PresenceMessage) {
        if let Some(sender) = self.sender.clone() {
            tokio::spawn(async move {
                sender.broadcast(&msg).await;
            });
        }
    }
}

fn delayed_interval(period: std::time::Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn recv_presence(presence: &mut Option<PresenceChannel>) -> Option<PresenceMessage> {
    match presence {
        Some(channel) => channel.recv().await,
        None => std::future::pending().await,
    }
}

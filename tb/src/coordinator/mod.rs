//! Single-instance coordination
//!
//! At most one TaskBurst instance on a machine edits the shared store at a
//! time. The active instance keeps a heartbeat record fresh under a well-known
//! key; every other instance stays blocked and polls until that record goes
//! stale or disappears.
//!
//! - [`InstanceCoordinator`] is the pure state machine, driven with explicit
//!   timestamps
//! - [`CoordinatorRunner`] drives it on tokio with timers, a storage watcher
//!   and the optional presence channel
//! - [`InstanceSession`] is the one-shot form used by short-lived commands

mod config;
mod handle;
mod identity;
mod lock;
mod machine;
mod messages;
mod runner;
mod session;

pub use config::{CHANNEL_NAME, CoordinatorConfig, HEARTBEAT_INTERVAL_MS, HEARTBEAT_KEY, HEARTBEAT_TIMEOUT_MS};
pub use handle::CoordinatorHandle;
pub use identity::InstanceId;
pub use lock::{Heartbeat, HeartbeatLock, InstanceLock};
pub use machine::{InstanceCoordinator, InstanceState};
pub use messages::{InstanceRequest, InstanceStatus};
pub use runner::CoordinatorRunner;
pub use session::{InstanceSession, SessionError, with_instance};

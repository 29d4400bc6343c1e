//! Message types for the coordinator runner

use serde::Serialize;
use tokio::sync::oneshot;

use super::lock::Heartbeat;
use super::machine::InstanceState;

/// Requests to the running coordinator task
#[derive(Debug)]
pub enum InstanceRequest {
    /// Re-run the mount check (the blocked notice's retry action)
    Retry { reply: oneshot::Sender<InstanceState> },

    /// Snapshot of the coordinator's view
    GetStatus { reply: oneshot::Sender<InstanceStatus> },

    /// Tear down: cancel timers, release the heartbeat if owned
    Shutdown,
}

/// Coordinator status snapshot
#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatus {
    /// This instance's id
    pub id: String,
    /// Current state
    pub state: InstanceState,
    /// Heartbeat record as currently stored
    pub holder: Option<Heartbeat>,
    /// Whether the presence channel is open
    pub presence_enabled: bool,
}

//! CoordinatorHandle - client interface to the running coordinator

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::identity::InstanceId;
use super::machine::InstanceState;
use super::messages::{InstanceRequest, InstanceStatus};

/// Handle to a [`CoordinatorRunner`](super::CoordinatorRunner) task
///
/// Cloneable. The runner tears down once every handle is dropped or
/// `shutdown` is called.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<InstanceRequest>,
    state_rx: watch::Receiver<InstanceState>,
    id: InstanceId,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<InstanceRequest>, state_rx: watch::Receiver<InstanceState>, id: InstanceId) -> Self {
        Self { tx, state_rx, id }
    }

    /// This instance's id
    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    /// Last published state
    pub fn state(&self) -> InstanceState {
        *self.state_rx.borrow()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<InstanceState> {
        self.state_rx.clone()
    }

    /// Wait until the coordinator reaches `target`
    pub async fn wait_for(&self, target: InstanceState) -> Result<()> {
        debug!(%target, "CoordinatorHandle::wait_for: called");
        let mut rx = self.state_rx.clone();
        rx.wait_for(|state| *state == target)
            .await
            .map_err(|_| eyre!("Coordinator stopped before reaching {}", target))?;
        Ok(())
    }

    /// Re-run the mount check, returning the resulting state
    pub async fn retry(&self) -> Result<InstanceState> {
        debug!(id = %self.id, "CoordinatorHandle::retry: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(InstanceRequest::Retry { reply })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;
        reply_rx.await.map_err(|_| eyre!("Coordinator stopped"))
    }

    /// Fetch a status snapshot
    pub async fn status(&self) -> Result<InstanceStatus> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(InstanceRequest::GetStatus { reply })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;
        reply_rx.await.map_err(|_| eyre!("Coordinator stopped"))
    }

    /// Request teardown
    pub async fn shutdown(&self) -> Result<()> {
        debug!(id = %self.id, "CoordinatorHandle::shutdown: called");
        self.tx
            .send(InstanceRequest::Shutdown)
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;
        Ok(())
    }
}

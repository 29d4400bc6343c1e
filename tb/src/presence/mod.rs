//! Cross-instance presence channel
//!
//! A same-machine broadcast between running instances built on Unix Domain
//! Sockets. Each instance binds `<channel-dir>/<instance-id>.sock`; sending a
//! message connects to every other socket in the directory and writes one JSON
//! line. Delivery is best-effort: the coordinator treats every message as a
//! hint to re-check the heartbeat record and stays correct without it.

use std::path::PathBuf;

mod channel;
mod messages;

pub use channel::{PresenceChannel, PresenceSender};
pub use messages::PresenceMessage;

/// Base directory shared by all instances for presence sockets
///
/// Uses the same base directory as the store's runtime files.
pub fn default_channel_base() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("taskburst")
}

//! Presence message types
//!
//! JSON-over-newline, one message per connection. Each message carries only
//! its kind and the sender's instance id.

use serde::{Deserialize, Serialize};

/// Presence announcements exchanged between instances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PresenceMessage {
    /// Sent by an instance as it mounts
    Ping { id: String },

    /// Reply from an Active instance to a foreign ping
    Pong { id: String },

    /// Sent by an instance as it becomes Active
    NewInstance { id: String },
}

impl PresenceMessage {
    /// Id of the sending instance
    pub fn sender(&self) -> &str {
        match self {
            Self::Ping { id } | Self::Pong { id } | Self::NewInstance { id } => id,
        }
    }

    /// Message kind as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::NewInstance { .. } => "new-instance",
        }
    }
}

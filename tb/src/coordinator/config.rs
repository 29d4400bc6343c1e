//! Instance coordinator configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Storage key holding the heartbeat record
pub const HEARTBEAT_KEY: &str = "taskburst-heartbeat";

/// Name of the presence channel (directory under the channel base)
pub const CHANNEL_NAME: &str = "taskburst-instance";

/// Heartbeat write period
pub const HEARTBEAT_INTERVAL_MS: u64 = 2000;

/// Age after which a heartbeat is considered dead
pub const HEARTBEAT_TIMEOUT_MS: u64 = 5000;

/// Instance coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Storage key for the heartbeat record
    #[serde(rename = "heartbeat-key", default = "default_heartbeat_key")]
    pub heartbeat_key: String,

    /// Presence channel name
    #[serde(rename = "channel-name", default = "default_channel_name")]
    pub channel_name: String,

    /// Base directory for presence sockets (defaults to the runtime dir)
    #[serde(rename = "channel-dir", default)]
    pub channel_dir: Option<PathBuf>,

    /// Heartbeat write period in milliseconds
    #[serde(rename = "heartbeat-interval-ms", default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Heartbeat staleness timeout in milliseconds
    #[serde(rename = "heartbeat-timeout-ms", default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,

    /// Re-check period while blocked, in milliseconds
    #[serde(rename = "poll-interval-ms", default = "default_heartbeat_interval_ms")]
    pub poll_interval_ms: u64,

    /// Storage-change watch period in milliseconds
    #[serde(rename = "watch-interval-ms", default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,

    /// Whether to open the presence channel at all
    #[serde(default = "default_presence")]
    pub presence: bool,
}

fn default_heartbeat_key() -> String {
    HEARTBEAT_KEY.to_string()
}

fn default_channel_name() -> String {
    CHANNEL_NAME.to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    HEARTBEAT_INTERVAL_MS
}

fn default_heartbeat_timeout_ms() -> u64 {
    HEARTBEAT_TIMEOUT_MS
}

fn default_watch_interval_ms() -> u64 {
    burststore::DEFAULT_WATCH_INTERVAL.as_millis() as u64
}

fn default_presence() -> bool {
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            heartbeat_key: default_heartbeat_key(),
            channel_name: default_channel_name(),
            channel_dir: None,
            heartbeat_interval_ms: HEARTBEAT_INTERVAL_MS,
            heartbeat_timeout_ms: HEARTBEAT_TIMEOUT_MS,
            poll_interval_ms: HEARTBEAT_INTERVAL_MS,
            watch_interval_ms: default_watch_interval_ms(),
            presence: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }

    /// Directory holding this channel's sockets
    pub fn presence_dir(&self) -> PathBuf {
        let base = self
            .channel_dir
            .clone()
            .unwrap_or_else(crate::presence::default_channel_base);
        let dir = base.join(&self.channel_name);
        debug!(?dir, "CoordinatorConfig::presence_dir");
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.heartbeat_key, "taskburst-heartbeat");
        assert_eq!(config.heartbeat_interval(), Duration::from_millis(2000));
        assert_eq!(config.heartbeat_timeout_ms, 5000);
        assert_eq!(config.poll_interval(), config.heartbeat_interval());
        assert_eq!(config.watch_interval(), burststore::DEFAULT_WATCH_INTERVAL);
        assert!(config.presence);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: CoordinatorConfig = serde_yaml::from_str("heartbeat-timeout-ms: 9000\npresence: false\n").unwrap();
        assert_eq!(config.heartbeat_timeout_ms, 9000);
        assert_eq!(config.heartbeat_interval_ms, 2000);
        assert!(!config.presence);
    }

    #[test]
    fn test_presence_dir_uses_channel_name() {
        let config = CoordinatorConfig {
            channel_dir: Some(PathBuf::from("/run/custom")),
            ..Default::default()
        };
        assert_eq!(config.presence_dir(), PathBuf::from("/run/custom/taskburst-instance"));
    }
}

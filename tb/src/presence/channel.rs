//! Presence channel listener and sender

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::messages::PresenceMessage;

/// Maximum message size
const MAX_MESSAGE_SIZE: usize = 1024;

/// Default timeout for delivering to one peer
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(250);

const SOCKET_EXTENSION: &str = "sock";

/// Bound presence socket plus the stream of messages it receives
pub struct PresenceChannel {
    sender: PresenceSender,
    rx: mpsc::Receiver<PresenceMessage>,
    socket_path: PathBuf,
    accept_task: JoinHandle<()>,
}

impl PresenceChannel {
    /// Bind this instance's socket inside `dir`
    ///
    /// Fails on platforms without Unix Domain Sockets or when the socket
    /// cannot be bound; callers run without the channel in that case.
    pub fn open(dir: &Path, instance_id: &str) -> Result<Self> {
        debug!(?dir, %instance_id, "PresenceChannel::open: called");
        std::fs::create_dir_all(dir).context("Failed to create presence directory")?;
        let socket_path = dir.join(format!("{}.{}", instance_id, SOCKET_EXTENSION));

        let (tx, rx) = mpsc::channel(64);
        let accept_task = spawn_listener(&socket_path, tx)?;

        let sender = PresenceSender {
            dir: dir.to_path_buf(),
            own_socket: socket_path.clone(),
            timeout: DEFAULT_SEND_TIMEOUT,
        };

        debug!(?socket_path, "PresenceChannel::open: bound");
        Ok(Self {
            sender,
            rx,
            socket_path,
            accept_task,
        })
    }

    /// Cloneable sender for broadcasting from other tasks
    pub fn sender(&self) -> PresenceSender {
        self.sender.clone()
    }

    /// Path of this instance's socket
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Wait for the next message from another instance
    pub async fn recv(&mut self) -> Option<PresenceMessage> {
        self.rx.recv().await
    }

    /// Stop listening and remove the socket file
    pub fn close(self) {
        self.accept_task.abort();
        cleanup_socket(&self.socket_path);
    }
}

#[cfg(unix)]
fn spawn_listener(socket_path: &Path, tx: mpsc::Sender<PresenceMessage>) -> Result<JoinHandle<()>> {
    use tokio::net::UnixListener;

    // Clean up stale socket if exists
    if socket_path.exists() {
        debug!(?socket_path, "spawn_listener: removing stale socket");
        std::fs::remove_file(socket_path).context("Failed to remove stale socket")?;
    }

    let listener = UnixListener::bind(socket_path).context("Failed to bind presence socket")?;

    Ok(tokio::spawn(async move {
        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!(error = %e, "Presence accept failed");
                    continue;
                }
            };
            let msg_tx = tx.clone();
            tokio::spawn(async move {
                match read_message(stream).await {
                    Ok(msg) => {
                        let _ = msg_tx.send(msg).await;
                    }
                    Err(e) => debug!(error = %e, "Presence: dropped unreadable message"),
                }
            });
            if tx.is_closed() {
                break;
            }
        }
    }))
}

#[cfg(not(unix))]
fn spawn_listener(_socket_path: &Path, _tx: mpsc::Sender<PresenceMessage>) -> Result<JoinHandle<()>> {
    Err(eyre::eyre!("Presence channel requires Unix Domain Sockets"))
}

#[cfg(unix)]
async fn read_message(stream: tokio::net::UnixStream) -> Result<PresenceMessage> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let bytes_read = reader
        .read_line(&mut line)
        .await
        .context("Failed to read presence message")?;

    if bytes_read > MAX_MESSAGE_SIZE {
        return Err(eyre::eyre!("Message too large: {} bytes", bytes_read));
    }
    if line.is_empty() {
        return Err(eyre::eyre!("Empty message received"));
    }

    let msg: PresenceMessage = serde_json::from_str(line.trim()).context("Failed to parse presence message")?;
    debug!(?msg, "read_message: parsed message");
    Ok(msg)
}

fn cleanup_socket(socket_path: &Path) {
    if socket_path.exists() {
        debug!(?socket_path, "cleanup_socket: removing socket file");
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(?socket_path, error = %e, "Failed to remove socket file");
        }
    }
}

/// Broadcasts presence messages to every other socket in the channel directory
#[derive(Debug, Clone)]
pub struct PresenceSender {
    dir: PathBuf,
    own_socket: PathBuf,
    timeout: Duration,
}

impl PresenceSender {
    /// Sockets of the other instances currently in the directory
    pub fn peers(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map(|e| e == SOCKET_EXTENSION).unwrap_or(false))
            .filter(|path| path != &self.own_socket)
            .collect()
    }

    /// Send a message to every peer, returning how many accepted it
    ///
    /// Fire-and-forget: failures are logged, never returned. A socket that
    /// refuses connections belongs to an instance that exited without cleanup
    /// and is removed.
    pub async fn broadcast(&self, msg: &PresenceMessage) -> usize {
        let line = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Presence: failed to serialize message");
                return 0;
            }
        };
        if line.len() > MAX_MESSAGE_SIZE {
            warn!(bytes = line.len(), "Presence: message too large, not sent");
            return 0;
        }

        let mut delivered = 0;
        for peer in self.peers() {
            match self.send_to(&peer, &line).await {
                Ok(()) => delivered += 1,
                Err(e) => debug!(?peer, error = %e, "Presence: delivery failed"),
            }
        }
        debug!(kind = msg.kind(), delivered, "Presence: broadcast");
        delivered
    }

    #[cfg(unix)]
    async fn send_to(&self, peer: &Path, line: &str) -> Result<()> {
        use tokio::io::AsyncWriteExt;
        use tokio::net::UnixStream;

        let mut stream = match tokio::time::timeout(self.timeout, UnixStream::connect(peer)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                debug!(?peer, "Presence: removing stale socket");
                cleanup_socket(peer);
                return Err(e).context("Peer socket is stale");
            }
            Ok(Err(e)) => return Err(e).context("Failed to connect to peer"),
            Err(_) => return Err(eyre::eyre!("Connection timeout")),
        };

        tokio::time::timeout(self.timeout, async {
            stream.write_all(line.as_bytes()).await.context("Failed to write message")?;
            stream.write_all(b"\n").await.context("Failed to write newline")?;
            stream.flush().await.context("Failed to flush stream")?;
            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Write timeout")??;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn send_to(&self, _peer: &Path, _line: &str) -> Result<()> {
        Err(eyre::eyre!("Presence channel requires Unix Domain Sockets"))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_binds_socket_and_close_removes_it() {
        let temp = TempDir::new().unwrap();
        let channel = PresenceChannel::open(temp.path(), "inst-a").unwrap();
        let path = channel.socket_path().to_path_buf();
        assert!(path.exists());

        channel.close();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_peer_not_self() {
        let temp = TempDir::new().unwrap();
        let mut a = PresenceChannel::open(temp.path(), "inst-a").unwrap();
        let mut b = PresenceChannel::open(temp.path(), "inst-b").unwrap();

        let delivered = a
            .sender()
            .broadcast(&PresenceMessage::Ping { id: "inst-a".into() })
            .await;
        assert_eq!(delivered, 1);

        let msg = tokio::time::timeout(Duration::from_secs(2), b.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg, PresenceMessage::Ping { id: "inst-a".into() });

        let own = tokio::time::timeout(Duration::from_millis(100), a.recv()).await;
        assert!(own.is_err(), "sender must not receive its own broadcast");

        a.close();
        b.close();
    }

    #[tokio::test]
    async fn test_listener_keeps_accepting() {
        let temp = TempDir::new().unwrap();
        let a = PresenceChannel::open(temp.path(), "inst-a").unwrap();
        let mut b = PresenceChannel::open(temp.path(), "inst-b").unwrap();
        let sender = a.sender();

        for _ in 0..3 {
            assert_eq!(sender.broadcast(&PresenceMessage::Ping { id: "inst-a".into() }).await, 1);
        }
        for _ in 0..3 {
            let msg = tokio::time::timeout(Duration::from_secs(2), b.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(msg, PresenceMessage::Ping { id: "inst-a".into() });
        }

        a.close();
        b.close();
    }

    #[tokio::test]
    async fn test_stale_socket_is_removed_on_broadcast() {
        let temp = TempDir::new().unwrap();
        let a = PresenceChannel::open(temp.path(), "inst-a").unwrap();

        // A socket file with no listener behind it
        let stale = temp.path().join("inst-dead.sock");
        {
            let listener = std::os::unix::net::UnixListener::bind(&stale).unwrap();
            drop(listener);
        }
        assert!(stale.exists());

        let delivered = a
            .sender()
            .broadcast(&PresenceMessage::NewInstance { id: "inst-a".into() })
            .await;
        assert_eq!(delivered, 0);
        assert!(!stale.exists());

        a.close();
    }

    #[tokio::test]
    async fn test_garbage_is_dropped() {
        use tokio::io::AsyncWriteExt;

        let temp = TempDir::new().unwrap();
        let mut a = PresenceChannel::open(temp.path(), "inst-a").unwrap();

        let mut stream = tokio::net::UnixStream::connect(a.socket_path()).await.unwrap();
        stream.write_all(b"not json\n").await.unwrap();
        drop(stream);

        let result = tokio::time::timeout(Duration::from_millis(100), a.recv()).await;
        assert!(result.is_err());
        a.close();
    }
}

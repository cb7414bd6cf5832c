use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::sync::Mutex;

/// Identifier handed out on registration
pub type ConnectionId = u64;

/// Pre-serialized payload shared by every connection of one broadcast
pub type Payload = Arc<str>;

/// Lifecycle of a live connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Registry of live notification channels.
///
/// Each connection is the sending half of a bounded channel drained by that
/// client's socket writer. The membership lock covers registration and the
/// snapshot taken by `broadcast`; it is released before any send.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, mpsc::Sender<Payload>>>,
    next_id: AtomicU64,
    send_timeout: Duration,
    channel_capacity: usize,
}

impl ConnectionRegistry {
    pub fn new(send_timeout: Duration, channel_capacity: usize) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            send_timeout,
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Create a channel for a new client and register its sender
    pub async fn open(&self) -> (ConnectionId, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let id = self.register(tx).await;
        (id, rx)
    }

    /// Register a sender. A sender already registered keeps its original id.
    pub async fn register(&self, sender: mpsc::Sender<Payload>) -> ConnectionId {
        let mut connections = self.connections.lock().await;

        if let Some((&id, _)) = connections.iter().find(|(_, tx)| tx.same_channel(&sender)) {
            return id;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        connections.insert(id, sender);
        tracing::info!("Connection {} opened ({} live)", id, connections.len());
        id
    }

    /// Remove a connection. Returns `false` if it was already closed.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        let removed = connections.remove(&id).is_some();
        if removed {
            tracing::info!("Connection {} closed ({} live)", id, connections.len());
        }
        removed
    }

    pub async fn state(&self, id: ConnectionId) -> ConnectionState {
        if self.connections.lock().await.contains_key(&id) {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }

    /// Send `message` to every open connection.
    ///
    /// Best effort: a connection whose receiver is gone or stays full past
    /// the send timeout is unregistered, and delivery to the others goes on.
    /// Failures are logged, never returned.
    pub async fn broadcast<T: Serialize>(&self, message: &T) -> BroadcastReport {
        let payload: Payload = match serde_json::to_string(message) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!("Failed to serialize broadcast message: {}", e);
                return BroadcastReport::default();
            }
        };

        let targets: Vec<(ConnectionId, mpsc::Sender<Payload>)> = {
            let connections = self.connections.lock().await;
            connections.iter().map(|(&id, tx)| (id, tx.clone())).collect()
        };

        if targets.is_empty() {
            return BroadcastReport::default();
        }

        let timeout = self.send_timeout;
        let results = join_all(targets.into_iter().map(|(id, tx)| {
            let payload = Arc::clone(&payload);
            async move { (id, tx.send_timeout(payload, timeout).await) }
        }))
        .await;

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(SendTimeoutError::Timeout(_)) => {
                    tracing::warn!("Connection {} did not accept update within {:?}", id, timeout);
                    failed.push(id);
                }
                Err(SendTimeoutError::Closed(_)) => {
                    tracing::warn!("Connection {} is gone, dropping it", id);
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut connections = self.connections.lock().await;
            for id in &failed {
                connections.remove(id);
            }
        }
        report.dropped = failed.len();

        tracing::debug!(
            "Broadcast delivered to {} connections, dropped {}",
            report.delivered,
            report.dropped
        );

        report
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(Duration::from_millis(50), 4)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection() {
        let registry = registry();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            receivers.push(registry.open().await.1);
        }

        let report = registry.broadcast(&json!({"type": "users-update"})).await;

        assert_eq!(report, BroadcastReport { delivered: 5, dropped: 0 });
        for rx in receivers.iter_mut() {
            let payload = rx.recv().await.unwrap();
            assert_eq!(&*payload, r#"{"type":"users-update"}"#);
        }
    }

    #[tokio::test]
    async fn test_failed_send_unregisters_only_that_connection() {
        let registry = registry();
        let (_, mut alive_a) = registry.open().await;
        let (gone, gone_rx) = registry.open().await;
        let (_, mut alive_b) = registry.open().await;
        drop(gone_rx);

        let report = registry.broadcast(&json!({"n": 1})).await;

        assert_eq!(report, BroadcastReport { delivered: 2, dropped: 1 });
        assert_eq!(registry.state(gone).await, ConnectionState::Closed);
        assert_eq!(registry.len().await, 2);
        assert!(alive_a.recv().await.is_some());
        assert!(alive_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_stalled_connection_does_not_block_others() {
        let registry = ConnectionRegistry::new(Duration::from_millis(50), 1);
        let (stalled, _stalled_rx) = registry.open().await;
        let (_, mut healthy) = registry.open().await;

        // Fill the stalled client's buffer; it never drains.
        registry.broadcast(&json!({"n": 1})).await;
        healthy.recv().await.unwrap();

        let report = registry.broadcast(&json!({"n": 2})).await;

        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(registry.state(stalled).await, ConnectionState::Closed);
        assert_eq!(&*healthy.recv().await.unwrap(), r#"{"n":2}"#);
    }

    #[tokio::test]
    async fn test_register_same_sender_once() {
        let registry = registry();
        let (tx, _rx) = mpsc::channel(1);

        let first = registry.register(tx.clone()).await;
        let second = registry.register(tx).await;

        assert_eq!(first, second);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_is_terminal() {
        let registry = registry();
        let (id, mut rx) = registry.open().await;
        assert_eq!(registry.state(id).await, ConnectionState::Open);

        assert!(registry.unregister(id).await);
        assert!(!registry.unregister(id).await);
        assert_eq!(registry.state(id).await, ConnectionState::Closed);

        let report = registry.broadcast(&json!({})).await;
        assert_eq!(report, BroadcastReport::default());
        // Registry held the only sender; the channel is now closed.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_isolated_registries() {
        let first = registry();
        let second = registry();
        let (_, _rx) = first.open().await;

        assert_eq!(first.len().await, 1);
        assert!(second.is_empty().await);
    }
}

use std::fmt::Debug;

use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{Message, Session};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::routes::AppState;
use crate::services::registry::{ConnectionId, Payload};
use crate::services::ConnectionRegistry;

/// Outbound half of a live connection
#[async_trait]
pub trait LiveSink: Send {
    type Error: Debug + Send;

    async fn send_text(&mut self, text: &str) -> Result<(), Self::Error>;

    async fn close(&mut self);
}

#[async_trait]
impl LiveSink for Session {
    type Error = actix_ws::Closed;

    async fn send_text(&mut self, text: &str) -> Result<(), Self::Error> {
        self.text(text.to_string()).await
    }

    async fn close(&mut self) {
        let _ = self.clone().close(None).await;
    }
}

/// Drain a connection's queue into its socket.
///
/// Returns once the registry has dropped the connection or the client stopped
/// accepting frames. Either way the connection ends up unregistered and the
/// socket closed, so the client sees the disconnect and can reconnect.
pub async fn forward_updates<S: LiveSink>(
    id: ConnectionId,
    mut updates: mpsc::Receiver<Payload>,
    sink: &mut S,
    registry: &ConnectionRegistry,
) {
    while let Some(payload) = updates.recv().await {
        if let Err(e) = sink.send_text(&payload).await {
            tracing::debug!("Connection {} send failed: {:?}", id, e);
            break;
        }
    }

    registry.unregister(id).await;
    sink.close().await;
    tracing::debug!("Connection {} writer finished", id);
}

/// Live update channel
///
/// GET /ws
///
/// Every connected client receives each `users-update` broadcast. Inbound
/// text is only logged; pings are answered.
pub async fn live_updates(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, mut msg_stream) = actix_ws::handle(&req, body)?;

    let registry = state.registry.clone();
    let (id, updates) = registry.open().await;

    let mut writer = session.clone();
    let writer_registry = registry.clone();
    actix_web::rt::spawn(async move {
        forward_updates(id, updates, &mut writer, &writer_registry).await;
    });

    // Reader: watch for close and answer pings.
    let mut session = session;
    actix_web::rt::spawn(async move {
        while let Some(msg) = msg_stream.recv().await {
            match msg {
                Ok(Message::Ping(bytes)) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Text(text)) => {
                    tracing::debug!("Connection {} sent: {}", id, text);
                }
                Ok(Message::Close(reason)) => {
                    registry.unregister(id).await;
                    let _ = session.close(reason).await;
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Connection {} protocol error: {}", id, e);
                    break;
                }
            }
        }
        registry.unregister(id).await;
        let _ = session.close(None).await;
    });

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{BroadcastReport, ConnectionState};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<String>,
        closed: bool,
        fail_sends: bool,
    }

    #[async_trait]
    impl LiveSink for RecordingSink {
        type Error = &'static str;

        async fn send_text(&mut self, text: &str) -> Result<(), Self::Error> {
            if self.fail_sends {
                return Err("client gone");
            }
            self.sent.push(text.to_string());
            Ok(())
        }

        async fn close(&mut self) {
            self.closed = true;
        }
    }

    #[tokio::test]
    async fn test_socket_closed_when_registry_drops_slow_client() {
        let registry = ConnectionRegistry::new(Duration::from_millis(50), 1);
        let (id, updates) = registry.open().await;

        // Queue holds one update; the second cannot be accepted in time.
        let first = registry.broadcast(&serde_json::json!({ "n": 1 })).await;
        let second = registry.broadcast(&serde_json::json!({ "n": 2 })).await;
        assert_eq!(first, BroadcastReport { delivered: 1, dropped: 0 });
        assert_eq!(second, BroadcastReport { delivered: 0, dropped: 1 });

        let mut sink = RecordingSink::default();
        forward_updates(id, updates, &mut sink, &registry).await;

        assert_eq!(sink.sent, vec![r#"{"n":1}"#.to_string()]);
        assert!(sink.closed);
        assert_eq!(registry.state(id).await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_failed_write_unregisters_and_closes() {
        let registry = ConnectionRegistry::new(Duration::from_millis(50), 4);
        let (id, updates) = registry.open().await;
        registry.broadcast(&serde_json::json!({ "n": 1 })).await;

        let mut sink = RecordingSink {
            fail_sends: true,
            ..Default::default()
        };
        forward_updates(id, updates, &mut sink, &registry).await;

        assert!(sink.sent.is_empty());
        assert!(sink.closed);
        assert_eq!(registry.state(id).await, ConnectionState::Closed);
        assert_eq!(registry.broadcast(&serde_json::json!({ "n": 2 })).await.delivered, 0);
    }
}

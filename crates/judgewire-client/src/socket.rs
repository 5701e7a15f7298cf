//! Transport handle boundary.
//!
//! The client consumes a socket abstraction, it does not implement one. The
//! transport library delivers inbound traffic (named events plus lifecycle
//! notices) on a channel and accepts outbound events through [`EventSink`].
//! Reconnection and backoff live inside the transport; this layer only
//! observes their lifecycle notices.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use judgewire_proto::ClientEvent;

/// Transport failure surfaced by an [`EventSink`].
#[derive(Debug, Error)]
pub enum SocketError {
    /// The transport handle is gone; nothing can be emitted.
    #[error("socket closed")]
    Closed,
    /// The transport reported a failure of its own.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Event delivered by the transport handle.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// Named server event with its payload, exactly as received.
    Message(Value),
    /// The link is up (first connect or a successful reconnect).
    Connect,
    /// The link dropped; the transport is retrying.
    Reconnecting,
    /// The transport exhausted its retries.
    ReconnectFailed,
}

/// Outbound half of the transport handle.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emit a named client event to the server.
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the event.
    async fn emit(&self, event: ClientEvent) -> Result<(), SocketError>;
}

#[async_trait]
impl EventSink for mpsc::Sender<ClientEvent> {
    async fn emit(&self, event: ClientEvent) -> Result<(), SocketError> {
        self.send(event).await.map_err(|_| SocketError::Closed)
    }
}

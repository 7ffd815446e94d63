//! Lifecycle notifications and the bounded channels that carry them.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::connection::handle::ConnectionId;
use crate::connection::transport::Frame;

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyKind {
    /// The connection was registered.
    Connected,
    /// The connection ended without a transport failure.
    Disconnected,
    /// The connection ended because of a failure.
    Error,
}

/// Why a connection ended with [`NotifyKind::Disconnected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The peer closed the connection.
    PeerClosed,
    /// Closed through `Hub::disconnect`.
    Closed,
    /// Evicted by a newer connection with the same client id.
    Replaced,
    /// The hub stopped.
    Shutdown,
}

/// A lifecycle event for one client connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlNotify {
    /// Client identifier.
    pub client_id: String,
    /// Connection the event belongs to.
    pub connection_id: ConnectionId,
    /// Event kind.
    pub kind: NotifyKind,
    /// Set for `Disconnected` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DisconnectReason>,
    /// Set for `Error` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
}

impl ControlNotify {
    fn new(client_id: &str, connection_id: ConnectionId, kind: NotifyKind) -> Self {
        Self {
            client_id: client_id.to_string(),
            connection_id,
            kind,
            reason: None,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    /// A `Connected` event.
    pub fn connected(client_id: &str, connection_id: ConnectionId) -> Self {
        Self::new(client_id, connection_id, NotifyKind::Connected)
    }

    /// A `Disconnected` event.
    pub fn disconnected(
        client_id: &str,
        connection_id: ConnectionId,
        reason: DisconnectReason,
    ) -> Self {
        Self {
            reason: Some(reason),
            ..Self::new(client_id, connection_id, NotifyKind::Disconnected)
        }
    }

    /// An `Error` event.
    pub fn error(client_id: &str, connection_id: ConnectionId, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(client_id, connection_id, NotifyKind::Error)
        }
    }

    /// Returns `true` for `Disconnected` and `Error` events.
    pub fn is_terminal(&self) -> bool {
        self.kind != NotifyKind::Connected
    }
}

/// A data frame received from a client, forwarded to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Client identifier.
    pub client_id: String,
    /// Connection the frame arrived on.
    pub connection_id: ConnectionId,
    /// The frame.
    pub frame: Frame,
}

/// Sending side of the control channel.
///
/// Delivery never waits: when the channel is full the newest event is
/// dropped and counted, and the same happens once the consumer is gone.
#[derive(Debug)]
pub struct ControlNotifier {
    tx: mpsc::Sender<ControlNotify>,
    emitted: AtomicU64,
    dropped: AtomicU64,
}

impl ControlNotifier {
    /// Wraps the caller's channel.
    pub fn new(tx: mpsc::Sender<ControlNotify>) -> Self {
        Self {
            tx,
            emitted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Tries to deliver `notify`. Returns the event back if it was dropped.
    pub fn emit(&self, notify: ControlNotify) -> Result<(), ControlNotify> {
        match self.tx.try_send(notify) {
            Ok(()) => {
                self.emitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(notify))
            | Err(mpsc::error::TrySendError::Closed(notify)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(notify)
            }
        }
    }

    /// Number of delivered events.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Number of dropped events.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_full_channel_drops_newest() {
        let (tx, mut rx) = mpsc::channel(1);
        let notifier = ControlNotifier::new(tx);
        let id = Uuid::new_v4();

        notifier.emit(ControlNotify::connected("alice", id)).unwrap();
        let dropped = notifier
            .emit(ControlNotify::disconnected("alice", id, DisconnectReason::PeerClosed))
            .unwrap_err();

        assert_eq!(dropped.kind, NotifyKind::Disconnected);
        assert_eq!(notifier.emitted(), 1);
        assert_eq!(notifier.dropped(), 1);
        assert_eq!(rx.try_recv().unwrap().kind, NotifyKind::Connected);
    }

    #[test]
    fn test_closed_consumer_counts_as_drop() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let notifier = ControlNotifier::new(tx);

        assert!(notifier.emit(ControlNotify::error("bob", Uuid::new_v4(), "reset")).is_err());
        assert_eq!(notifier.dropped(), 1);
    }

    #[test]
    fn test_serialized_shape() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(ControlNotify::disconnected(
            "alice",
            id,
            DisconnectReason::Shutdown,
        ))
        .unwrap();

        assert_eq!(value["client_id"], "alice");
        assert_eq!(value["kind"], "disconnected");
        assert_eq!(value["reason"], "shutdown");
        assert!(value.get("detail").is_none());
    }
}

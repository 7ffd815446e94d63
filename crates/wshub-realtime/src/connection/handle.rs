//! Control side of a single connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use wshub_core::{HubError, HubResult};

use super::transport::Frame;

/// Unique connection identifier, fresh for every `connect`.
pub type ConnectionId = Uuid;

/// Why the hub asked a connection to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Closed on request through `Hub::disconnect`.
    Closed,
    /// Evicted by a newer connection with the same client id.
    Replaced,
    /// Closed because the hub is stopping.
    Shutdown,
    /// No inbound activity within the heartbeat limit.
    HeartbeatTimeout,
}

/// A handle to a single registered connection.
///
/// The transport itself lives in the connection task; the handle carries
/// the outbound queue, the cancellation token and liveness metadata.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Caller-chosen client identifier
    pub client_id: String,
    /// When the connection was registered
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Frame>,
    cancel: CancellationToken,
    finished: CancellationToken,
    close_reason: OnceLock<CloseReason>,
    last_activity: Mutex<Instant>,
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new handle and the receiving end of its outbound queue.
    ///
    /// `cancel` is normally a child of the hub's shutdown token.
    pub fn new(
        client_id: String,
        buffer: usize,
        cancel: CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            client_id,
            connected_at: Utc::now(),
            sender,
            cancel,
            finished: CancellationToken::new(),
            close_reason: OnceLock::new(),
            last_activity: Mutex::new(Instant::now()),
            alive: AtomicBool::new(true),
        };
        (Arc::new(handle), receiver)
    }

    /// Queue a frame for this connection without waiting.
    pub fn send(&self, frame: Frame) -> HubResult<()> {
        if !self.is_alive() {
            return Err(HubError::not_found(format!(
                "connection {} for client '{}' is closing",
                self.id, self.client_id
            )));
        }
        match self.sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(HubError::backpressure(format!(
                "outbound queue of client '{}' is full",
                self.client_id
            ))),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                Err(HubError::not_found(format!(
                    "connection {} for client '{}' is closed",
                    self.id, self.client_id
                )))
            }
        }
    }

    /// Ask the connection task to close. The first reason wins.
    ///
    /// Returns `false` if a close had already been requested.
    pub fn close(&self, reason: CloseReason) -> bool {
        let first = self.close_reason.set(reason).is_ok();
        self.mark_dead();
        self.cancel.cancel();
        first
    }

    /// The reason given to the first `close` call, if any.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason.get().copied()
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Record inbound activity.
    pub fn touch(&self) {
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    /// Time since the last inbound activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
    }

    /// Resolves once the connection task has been asked to stop.
    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.cancel();
    }

    /// Whether the connection task has exited.
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    /// Resolves once the connection task has closed its transport and
    /// emitted its final notification.
    pub async fn closed(&self) {
        self.finished.cancelled().await
    }

    /// Get a snapshot of connection info
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            client_id: self.client_id.clone(),
            connected_at: self.connected_at,
            idle_ms: u64::try_from(self.idle_for().as_millis()).unwrap_or(u64::MAX),
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Client identifier
    pub client_id: String,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Milliseconds since the last inbound activity
    pub idle_ms: u64,
    /// Is alive
    pub alive: bool,
}

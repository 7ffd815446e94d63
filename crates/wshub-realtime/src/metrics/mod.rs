//! Hub metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Hub-level metrics counters.
#[derive(Debug, Default)]
pub struct HubMetrics {
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    connections_replaced: AtomicU64,
    connections_rejected: AtomicU64,
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    inbound_dropped: AtomicU64,
    transport_errors: AtomicU64,
    heartbeat_timeouts: AtomicU64,
}

impl HubMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registered connection
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished connection task
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record an eviction by a newer connection
    pub fn connection_replaced(&self) {
        self.connections_replaced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refused `connect`
    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame read from a client
    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame written to a client
    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound frame the consumer had no room for
    pub fn inbound_dropped(&self) {
        self.inbound_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transport failure
    pub fn transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a heartbeat timeout
    pub fn heartbeat_timeout(&self) {
        self.heartbeat_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters. Notification counters are owned by
    /// the control notifier and filled in by the hub.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_replaced: self.connections_replaced.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            inbound_dropped: self.inbound_dropped.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            heartbeat_timeouts: self.heartbeat_timeouts.load(Ordering::Relaxed),
            notifications_emitted: 0,
            notifications_dropped: 0,
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever registered
    pub connections_total: u64,
    /// Connections whose task is still running
    pub connections_active: u64,
    /// Connections evicted by a duplicate client id
    pub connections_replaced: u64,
    /// `connect` calls refused after validation
    pub connections_rejected: u64,
    /// Frames read from clients
    pub frames_received: u64,
    /// Frames written to clients
    pub frames_sent: u64,
    /// Inbound frames dropped because the consumer was full or gone
    pub inbound_dropped: u64,
    /// Transport failures
    pub transport_errors: u64,
    /// Connections closed by the heartbeat
    pub heartbeat_timeouts: u64,
    /// Control notifications delivered
    pub notifications_emitted: u64,
    /// Control notifications dropped
    pub notifications_dropped: u64,
}

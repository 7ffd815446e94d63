//! # wshub
//!
//! WebSocket connection hub. Provides:
//!
//! - A synchronized registry of named client connections
//! - One task per connection that reads, writes and closes its transport
//! - Lifecycle events (connected, disconnected, error) on a bounded
//!   control channel that never blocks connection tasks
//! - Heartbeat supervision and graceful shutdown
//! - The JSON message types spoken by the browser client

pub mod connection;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod notify;

pub use connection::handle::{CloseReason, ConnectionHandle, ConnectionId};
pub use connection::registry::ConnectionRegistry;
pub use connection::transport::{Frame, Transport};
pub use hub::{Hub, HubBuilder, HubState};
pub use notify::{ControlNotifier, ControlNotify, DisconnectReason, InboundFrame, NotifyKind};

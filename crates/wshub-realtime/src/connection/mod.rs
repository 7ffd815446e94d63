//! Connection management: transport seam, handles, registry, per-connection
//! task and heartbeat supervision.

pub mod handle;
pub mod heartbeat;
pub mod registry;
pub(crate) mod task;
pub mod transport;
pub mod tungstenite;

pub use handle::ConnectionHandle;
pub use registry::ConnectionRegistry;

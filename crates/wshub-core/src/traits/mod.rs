//! Capability traits injected into the hub by callers.

pub mod logger;

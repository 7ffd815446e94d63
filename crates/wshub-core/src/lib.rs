//! # wshub-core
//!
//! Core crate for wshub. Contains the error taxonomy, configuration
//! schemas and the `BasicLogger` capability consumed by the hub.
//!
//! This crate has **no** internal dependencies on other wshub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::{ErrorKind, HubError};
pub use result::HubResult;
pub use traits::logger::{BasicLogger, TracingLogger};

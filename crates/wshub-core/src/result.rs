//! Convenience result type alias for wshub.

use crate::error::HubError;

/// A specialized `Result` type for hub operations.
pub type HubResult<T> = Result<T, HubError>;

//! Error types for routing.

use thiserror::Error;

/// Errors returned by a [`ClosestPeerer`](crate::ClosestPeerer).
///
/// "The local node is closest" is not an error; see [`Route::WantSelf`](crate::Route::WantSelf).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// No peer is known to route toward.
    #[error("no peer found")]
    NotFound,

    /// The routing backend failed.
    #[error("topology error: {0}")]
    Other(String),
}

/// Result type for routing operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

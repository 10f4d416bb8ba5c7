//! Error types for the node facade.

use swarmsync_core::CoreError;
use swarmsync_pushsync::PushSyncError;
use swarmsync_store::StoreError;
use thiserror::Error;

/// Errors that can occur while building or driving a [`Node`](crate::Node).
#[derive(Debug, Error)]
pub enum NodeError {
    /// The configured overlay address is not 32 bytes of hex.
    #[error("invalid overlay address: {0}")]
    Overlay(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Push-sync error.
    #[error("pushsync error: {0}")]
    PushSync(#[from] PushSyncError),

    /// Metrics could not be registered.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// The data directory could not be prepared.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The node has been closed.
    #[error("node is closed")]
    Closed,
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

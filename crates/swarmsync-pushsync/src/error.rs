//! Error types for the push-sync protocol.

use swarmsync_core::Address;
use swarmsync_store::StoreError;
use swarmsync_topology::TopologyError;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur while pushing or receiving a chunk.
///
/// Every variant is scoped to one chunk or one stream. None of them stop the
/// worker loop.
#[derive(Debug, Error)]
pub enum PushSyncError {
    /// Stream open, write or read failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The round-trip deadline expired.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The peer closed the stream before sending the expected message.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A message decoded but its contents are not acceptable.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The receipt acknowledges a different address than the one delivered.
    #[error("invalid receipt: expected {expected}, got {actual}")]
    InvalidReceipt { expected: Address, actual: String },

    /// Wire encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Local storage failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Routing failed for a reason other than "self is closest".
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    /// The chunk has used up its retry budget; no stream was opened.
    #[error("retries exhausted for {address}")]
    RetryExhausted { address: Address },

    /// Shutdown aborted the operation.
    #[error("push-sync shutting down")]
    Cancelled,

    /// Metric registration failed.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl PushSyncError {
    /// Whether the error came from the network rather than local state.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PushSyncError::Transport(_)
                | PushSyncError::Timeout(_)
                | PushSyncError::UnexpectedEof
                | PushSyncError::InvalidMessage(_)
                | PushSyncError::InvalidReceipt { .. }
                | PushSyncError::Codec(_)
        )
    }
}

/// Result type for push-sync operations.
pub type Result<T> = std::result::Result<T, PushSyncError>;

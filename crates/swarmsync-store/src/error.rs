//! Error types for the store module.

use swarmsync_core::{Address, CoreError};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No chunk stored under this address.
    #[error("chunk not found: {0}")]
    NotFound(Address),

    /// A stored row could not be turned back into a chunk.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Chunk construction failed.
    #[error("invalid chunk: {0}")]
    Chunk(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking storage task failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

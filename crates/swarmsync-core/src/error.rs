//! Error types for swarmsync core primitives.

use thiserror::Error;

/// Errors raised while constructing core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid address length: expected 32 bytes, got {0}")]
    InvalidAddressLength(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("chunk data too large: {size} bytes exceeds maximum of {max}")]
    ChunkTooLarge { size: usize, max: usize },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

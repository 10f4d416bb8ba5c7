//! Chunks: the unit of storage and synchronization.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{CoreError, Result};

/// Payload size of a full chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Size of the span prefix carried in front of chunk payloads.
pub const SPAN_SIZE: usize = 8;

/// Largest data blob a chunk may carry (span + payload).
pub const MAX_CHUNK_DATA_SIZE: usize = CHUNK_SIZE + SPAN_SIZE;

/// An immutable content-addressed chunk.
///
/// The address is trusted as given. Cloning is cheap: the data is a
/// reference-counted [`Bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    address: Address,
    data: Bytes,
}

impl Chunk {
    /// Create a chunk, rejecting data larger than [`MAX_CHUNK_DATA_SIZE`].
    pub fn new(address: Address, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() > MAX_CHUNK_DATA_SIZE {
            return Err(CoreError::ChunkTooLarge {
                size: data.len(),
                max: MAX_CHUNK_DATA_SIZE,
            });
        }
        Ok(Self { address, data })
    }

    /// The chunk's address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The chunk's data.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size of the data in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the chunk carries no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split into address and data.
    pub fn into_parts(self) -> (Address, Bytes) {
        (self.address, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_new() {
        let chunk = Chunk::new(Address::ZERO, &b"1234"[..]).unwrap();
        assert_eq!(chunk.address(), &Address::ZERO);
        assert_eq!(chunk.data().as_ref(), b"1234");
        assert_eq!(chunk.len(), 4);
    }

    #[test]
    fn test_chunk_max_size_accepted() {
        let data = vec![0u8; MAX_CHUNK_DATA_SIZE];
        assert!(Chunk::new(Address::ZERO, data).is_ok());
    }

    #[test]
    fn test_chunk_too_large() {
        let data = vec![0u8; MAX_CHUNK_DATA_SIZE + 1];
        let err = Chunk::new(Address::ZERO, data).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ChunkTooLarge { size, max } if size == MAX_CHUNK_DATA_SIZE + 1 && max == MAX_CHUNK_DATA_SIZE
        ));
    }
}

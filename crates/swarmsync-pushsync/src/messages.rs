//! Push-sync wire messages.
//!
//! A push-sync stream carries exactly two messages: one [`Delivery`] from the
//! opener and one [`Receipt`] back. The same pair is used for the initial
//! hand-off and for every forwarding hop.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use swarmsync_core::{Address, Chunk, ADDRESS_LEN, MAX_CHUNK_DATA_SIZE};

use crate::error::{PushSyncError, Result};

/// Protocol name registered with the transport.
pub const PROTOCOL_NAME: &str = "pushsync";

/// Protocol version registered with the transport.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Stream name within the protocol.
pub const STREAM_NAME: &str = "pushsync";

/// A chunk handed to the next hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub address: Bytes,
    pub data: Bytes,
}

impl Delivery {
    /// Build a delivery carrying `chunk` unchanged.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            address: Bytes::copy_from_slice(chunk.address().as_bytes()),
            data: chunk.data().clone(),
        }
    }

    /// Validate the delivery and turn it into a chunk.
    ///
    /// The address is taken as given; it is never recomputed from the data.
    pub fn into_chunk(self) -> Result<Chunk> {
        if self.address.len() != ADDRESS_LEN {
            return Err(PushSyncError::InvalidMessage(format!(
                "delivery address is {} bytes, expected {}",
                self.address.len(),
                ADDRESS_LEN
            )));
        }
        if self.data.len() > MAX_CHUNK_DATA_SIZE {
            return Err(PushSyncError::InvalidMessage(format!(
                "delivery data is {} bytes, max {}",
                self.data.len(),
                MAX_CHUNK_DATA_SIZE
            )));
        }
        let address = Address::try_from(self.address.as_ref())
            .map_err(|e| PushSyncError::InvalidMessage(e.to_string()))?;
        Chunk::new(address, self.data).map_err(|e| PushSyncError::InvalidMessage(e.to_string()))
    }
}

/// One-hop acknowledgment: the sender of this receipt has stored the chunk.
///
/// Receipts always echo the acknowledged address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub address: Bytes,
}

impl Receipt {
    /// Receipt acknowledging `address`.
    pub fn for_address(address: &Address) -> Self {
        Self {
            address: Bytes::copy_from_slice(address.as_bytes()),
        }
    }

    /// Check that this receipt acknowledges `expected`.
    pub fn verify(&self, expected: &Address) -> Result<()> {
        if self.address.as_ref() == expected.as_bytes().as_slice() {
            Ok(())
        } else {
            Err(PushSyncError::InvalidReceipt {
                expected: *expected,
                actual: hex::encode(&self.address),
            })
        }
    }
}

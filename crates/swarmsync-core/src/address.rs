//! Overlay addresses.
//!
//! Chunks and peers share one 32-byte address space. A chunk address is a
//! content hash; a peer address is the node's overlay identity. Routing
//! compares the two with the XOR metric in [`crate::proximity`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::proximity::{self, Distance};

/// Length of an overlay address in bytes.
pub const ADDRESS_LEN: usize = 32;

/// A 32-byte overlay address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s)?;
        Self::try_from(bytes.as_slice())
    }

    /// XOR distance from this address to `other`.
    pub fn distance(&self, other: &Address) -> Distance {
        Distance::between(self, other)
    }

    /// Proximity order: number of leading bits shared with `other`.
    pub fn proximity(&self, other: &Address) -> u32 {
        proximity::proximity(self, other)
    }

    /// Returns true if `a` is strictly closer to this address than `b`.
    pub fn closer(&self, a: &Address, b: &Address) -> bool {
        self.distance(a) < self.distance(b)
    }

    /// The zero address.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; ADDRESS_LEN] = slice
            .try_into()
            .map_err(|_| CoreError::InvalidAddressLength(slice.len()))?;
        Ok(Self(arr))
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

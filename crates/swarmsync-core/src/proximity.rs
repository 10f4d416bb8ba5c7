//! XOR proximity metric over the overlay address space.
//!
//! The distance between two addresses is their bytewise XOR read as a
//! 256-bit big-endian integer. Comparing two distances therefore reduces to
//! lexicographic comparison of the XOR bytes, which is what the derived
//! `Ord` on [`Distance`] does.

use std::fmt;

use crate::address::{Address, ADDRESS_LEN};

/// Maximum proximity order (two identical addresses).
pub const MAX_PO: u32 = (ADDRESS_LEN as u32) * 8;

/// XOR distance between two addresses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Distance(pub [u8; ADDRESS_LEN]);

impl Distance {
    /// Compute the distance between `a` and `b`.
    pub fn between(a: &Address, b: &Address) -> Self {
        let mut out = [0u8; ADDRESS_LEN];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = a.0[i] ^ b.0[i];
        }
        Self(out)
    }

    /// Zero distance (an address to itself).
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);
}

impl fmt::Debug for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Distance({})", &hex::encode(self.0)[..16])
    }
}

/// Proximity order of two addresses: the number of leading bits they share.
///
/// Returns [`MAX_PO`] for identical addresses.
pub fn proximity(a: &Address, b: &Address) -> u32 {
    for i in 0..ADDRESS_LEN {
        let x = a.0[i] ^ b.0[i];
        if x != 0 {
            return (i as u32) * 8 + x.leading_zeros();
        }
    }
    MAX_PO
}

//! Proptest generators for property-based testing.

use proptest::prelude::*;

use swarmsync_core::{Address, Chunk, MAX_CHUNK_DATA_SIZE};

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(Address::from_bytes)
}

/// Generate chunk payload bytes of at most `max_len` bytes.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len.min(MAX_CHUNK_DATA_SIZE))
}

/// Generate a chunk with an arbitrary address and a small payload.
pub fn chunk() -> impl Strategy<Value = Chunk> {
    (address(), payload(256)).prop_map(|(address, data)| {
        Chunk::new(address, data).expect("payload within bounds")
    })
}

/// Generate a set of distinct node addresses, between `min` and `max` of them.
pub fn overlay(min: usize, max: usize) -> impl Strategy<Value = Vec<Address>> {
    prop::collection::btree_set(address(), min..=max).prop_map(|set| set.into_iter().collect())
}

//! Test fixtures and helpers.
//!
//! Common setup code for push-sync tests.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;

use swarmsync_core::{Address, Chunk, CHUNK_SIZE};
use swarmsync_pushsync::{PushSync, PushSyncConfig};
use swarmsync_store::MemoryStore;

use crate::recorder::Recorder;
use crate::topology::MockTopology;

/// An address whose first byte is `first` and the rest zero.
///
/// `address(0x70)` is `7000…00`.
pub fn address(first: u8) -> Address {
    let mut bytes = [0u8; 32];
    bytes[0] = first;
    Address::from_bytes(bytes)
}

/// The chunk used across scenario tests: address `7000…`, data `"1234"`.
pub fn test_chunk() -> Chunk {
    chunk_at(address(0x70), b"1234")
}

/// A chunk at an arbitrary address. The address is not checked against the
/// data.
pub fn chunk_at(address: Address, data: &[u8]) -> Chunk {
    // test data is always small
    Chunk::new(address, data.to_vec()).unwrap()
}

/// A chunk addressed by the BLAKE3 hash of its data.
pub fn content_chunk(data: &[u8]) -> Chunk {
    chunk_at(content_address(data), data)
}

/// A full-size chunk of random bytes, addressed by content.
pub fn random_chunk() -> Chunk {
    let mut data = vec![0u8; CHUNK_SIZE];
    rand::thread_rng().fill_bytes(&mut data);
    content_chunk(&data)
}

/// A uniformly random address.
pub fn random_address() -> Address {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Address::from_bytes(bytes)
}

/// BLAKE3 of `data`, as an address.
pub fn content_address(data: &[u8]) -> Address {
    Address::from_bytes(*blake3::hash(data).as_bytes())
}

/// Push-sync timings scaled down for tests.
pub fn fast_config() -> PushSyncConfig {
    PushSyncConfig {
        retry_interval: Duration::from_millis(100),
        receipt_timeout: Duration::from_millis(500),
        max_retries: 3,
        empty_batch_delay: Duration::from_millis(20),
    }
}

/// A push-sync instance over a memory store, scripted routing and a
/// recording streamer.
pub struct PushSyncFixture {
    pub base: Address,
    pub store: Arc<MemoryStore>,
    pub topology: Arc<MockTopology>,
    pub recorder: Arc<Recorder>,
    pub pushsync: PushSync<MemoryStore, MockTopology, Recorder>,
}

impl PushSyncFixture {
    /// Build a fixture for the node at `base`. Nothing is started.
    pub fn new(base: Address, topology: MockTopology, recorder: Recorder) -> Self {
        Self::with_config(base, topology, recorder, fast_config())
    }

    pub fn with_config(
        base: Address,
        topology: MockTopology,
        recorder: Recorder,
        config: PushSyncConfig,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let topology = Arc::new(topology);
        let recorder = Arc::new(recorder);
        let pushsync = PushSync::new(
            base,
            Arc::clone(&store),
            Arc::clone(&topology),
            Arc::clone(&recorder),
            config,
        )
        .unwrap();
        Self {
            base,
            store,
            topology,
            recorder,
            pushsync,
        }
    }
}

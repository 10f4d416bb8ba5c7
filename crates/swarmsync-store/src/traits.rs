//! Store trait: the abstract interface for chunk persistence.
//!
//! This trait keeps the push-sync protocol storage-agnostic. Implementations
//! include SQLite (persistent) and in-memory (for tests and ephemeral nodes).

use async_trait::async_trait;
use swarmsync_core::{Address, Chunk};

use crate::error::Result;
use crate::subscription::PushSubscription;

/// How a chunk entered the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModePut {
    /// Produced locally; must be pushed to the network.
    Upload,
    /// Received from a peer over push-sync.
    Sync,
}

/// Result of putting a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    /// Chunk was stored.
    Inserted,
    /// A chunk with this address is already stored (idempotent - not an error).
    AlreadyExists,
}

/// Synchronization state of a stored chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Uploaded locally and waiting in the push index.
    Pending,
    /// Received via sync and not yet settled by the handler.
    Received,
    /// Handed off to the next hop, or stored at its closest node.
    Synced,
}

impl SyncState {
    pub(crate) fn to_i64(self) -> i64 {
        match self {
            SyncState::Pending => 0,
            SyncState::Received => 1,
            SyncState::Synced => 2,
        }
    }

    pub(crate) fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(SyncState::Pending),
            1 => Some(SyncState::Received),
            2 => Some(SyncState::Synced),
            _ => None,
        }
    }
}

/// The Store trait: async interface for chunk persistence.
///
/// # Design Notes
///
/// - **Idempotent puts**: putting an address twice returns `AlreadyExists`
///   and does not change its sync state.
/// - **Push index**: only `ModePut::Upload` adds a chunk to the push index;
///   `set_synced` removes it.
#[async_trait]
pub trait Store: Send + Sync {
    /// Store a chunk.
    async fn put(&self, mode: ModePut, chunk: &Chunk) -> Result<PutResult>;

    /// Get a chunk by address.
    async fn get(&self, address: &Address) -> Result<Option<Chunk>>;

    /// Check whether a chunk is stored.
    async fn has(&self, address: &Address) -> Result<bool>;

    /// Mark a chunk as synced, removing it from the push index.
    ///
    /// Returns `NotFound` if no chunk is stored under `address`.
    async fn set_synced(&self, address: &Address) -> Result<()>;

    /// Get the sync state of a stored chunk.
    async fn sync_state(&self, address: &Address) -> Result<Option<SyncState>>;

    /// Number of chunks currently in the push index.
    async fn pending_count(&self) -> Result<usize>;

    /// Open a live feed over the push index, starting from its beginning.
    async fn subscribe_push(&self) -> Result<PushSubscription>;
}

//! In-memory implementation of the Store trait.
//!
//! Same semantics as SQLite but keeps everything in memory with no
//! persistence. Cloning a `MemoryStore` yields another handle to the same
//! chunks.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::watch;

use swarmsync_core::{Address, Chunk};

use crate::error::{Result, StoreError};
use crate::subscription::{spawn_push_feed, PushIndex, PushSubscription};
use crate::traits::{ModePut, PutResult, Store, SyncState};

/// In-memory store implementation.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
    /// Bumped on every upload to wake live push feeds.
    trigger: Arc<watch::Sender<u64>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Chunks indexed by address.
    chunks: HashMap<Address, StoredChunk>,

    /// Push index: push sequence -> address, pending chunks only.
    push_index: BTreeMap<u64, Address>,

    /// Next push sequence to hand out.
    next_seq: u64,
}

struct StoredChunk {
    chunk: Chunk,
    state: SyncState,
    push_seq: Option<u64>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        let (trigger, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(MemoryStoreInner::default())),
            trigger: Arc::new(trigger),
        }
    }

    /// Number of chunks stored, in any state.
    pub fn len(&self) -> usize {
        read(&self.inner).chunks.len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read(lock: &RwLock<MemoryStoreInner>) -> RwLockReadGuard<'_, MemoryStoreInner> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(lock: &RwLock<MemoryStoreInner>) -> RwLockWriteGuard<'_, MemoryStoreInner> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, mode: ModePut, chunk: &Chunk) -> Result<PutResult> {
        {
            let mut inner = write(&self.inner);

            if inner.chunks.contains_key(chunk.address()) {
                return Ok(PutResult::AlreadyExists);
            }

            let (state, push_seq) = match mode {
                ModePut::Upload => {
                    let seq = inner.next_seq;
                    inner.next_seq += 1;
                    inner.push_index.insert(seq, *chunk.address());
                    (SyncState::Pending, Some(seq))
                }
                ModePut::Sync => (SyncState::Received, None),
            };

            inner.chunks.insert(
                *chunk.address(),
                StoredChunk {
                    chunk: chunk.clone(),
                    state,
                    push_seq,
                },
            );
        }

        if mode == ModePut::Upload {
            self.trigger.send_modify(|v| *v = v.wrapping_add(1));
        }

        Ok(PutResult::Inserted)
    }

    async fn get(&self, address: &Address) -> Result<Option<Chunk>> {
        let inner = read(&self.inner);
        Ok(inner.chunks.get(address).map(|sc| sc.chunk.clone()))
    }

    async fn has(&self, address: &Address) -> Result<bool> {
        let inner = read(&self.inner);
        Ok(inner.chunks.contains_key(address))
    }

    async fn set_synced(&self, address: &Address) -> Result<()> {
        let mut inner = write(&self.inner);

        let push_seq = {
            let stored = inner
                .chunks
                .get_mut(address)
                .ok_or(StoreError::NotFound(*address))?;
            stored.state = SyncState::Synced;
            stored.push_seq.take()
        };

        if let Some(seq) = push_seq {
            inner.push_index.remove(&seq);
        }

        Ok(())
    }

    async fn sync_state(&self, address: &Address) -> Result<Option<SyncState>> {
        let inner = read(&self.inner);
        Ok(inner.chunks.get(address).map(|sc| sc.state))
    }

    async fn pending_count(&self) -> Result<usize> {
        let inner = read(&self.inner);
        Ok(inner.push_index.len())
    }

    async fn subscribe_push(&self) -> Result<PushSubscription> {
        let index = MemoryPushIndex {
            inner: Arc::clone(&self.inner),
        };
        Ok(spawn_push_feed(index, self.trigger.subscribe()))
    }
}

struct MemoryPushIndex {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[async_trait]
impl PushIndex for MemoryPushIndex {
    async fn next_pending(&self, after: Option<u64>) -> Result<Option<(u64, Chunk)>> {
        let inner = read(&self.inner);

        let lower = match after {
            Some(seq) => Bound::Excluded(seq),
            None => Bound::Unbounded,
        };

        let next = inner
            .push_index
            .range((lower, Bound::Unbounded))
            .next()
            .and_then(|(seq, address)| {
                inner
                    .chunks
                    .get(address)
                    .map(|sc| (*seq, sc.chunk.clone()))
            });

        Ok(next)
    }
}

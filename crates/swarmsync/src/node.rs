//! The Node: one overlay participant with its store, routing table and
//! push-sync instance, attached to an in-process network.

use std::sync::Arc;

use prometheus::Registry;
use swarmsync_core::{Address, Chunk};
use swarmsync_pushsync::{MemoryNetwork, MemoryStreamer, PushSync, PushSyncMetrics};
use swarmsync_store::{MemoryStore, ModePut, PutResult, SqliteStore, Store, SyncState};
use swarmsync_topology::ProximityTable;

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};

/// The push-sync instance a [`Node`] drives.
pub type NodePushSync = PushSync<dyn Store, ProximityTable, MemoryStreamer>;

/// A node on a [`MemoryNetwork`].
///
/// Building a node registers its push-sync protocol on the network; closing
/// or dropping it unregisters again. Uploaded chunks are pushed by the
/// worker once [`start`](Node::start) has been called.
pub struct Node {
    base: Address,
    store: Arc<dyn Store>,
    topology: Arc<ProximityTable>,
    network: Arc<MemoryNetwork>,
    pushsync: NodePushSync,
}

impl Node {
    /// Build a node from config. Opens a SQLite store under `data_dir` when
    /// one is set, otherwise keeps chunks in memory.
    pub fn new(config: &NodeConfig, network: Arc<MemoryNetwork>) -> Result<Self> {
        let base = config.overlay_address()?;

        let store: Arc<dyn Store> = match (&config.data_dir, config.db_path()) {
            (Some(dir), Some(path)) => {
                std::fs::create_dir_all(dir)?;
                tracing::debug!(base = %base, path = %path.display(), "opening sqlite store");
                Arc::new(SqliteStore::open(&path)?)
            }
            _ => Arc::new(MemoryStore::new()),
        };

        Self::with_store(base, store, network, config)
    }

    /// Build a node over an existing store.
    pub fn with_store(
        base: Address,
        store: Arc<dyn Store>,
        network: Arc<MemoryNetwork>,
        config: &NodeConfig,
    ) -> Result<Self> {
        let topology = Arc::new(ProximityTable::new(base));
        let streamer = Arc::new(network.streamer(base));

        let pushsync = PushSync::new(
            base,
            Arc::clone(&store),
            Arc::clone(&topology),
            streamer,
            config.pushsync.clone(),
        )?;
        network.register(base, pushsync.protocol());

        tracing::info!(base = %base, "node ready");

        Ok(Self {
            base,
            store,
            topology,
            network,
            pushsync,
        })
    }

    /// Start pushing uploaded chunks in the background.
    pub fn start(&self) {
        self.pushsync.start();
    }

    /// Store a locally produced chunk and queue it for pushing.
    pub async fn upload(&self, chunk: &Chunk) -> Result<PutResult> {
        if self.pushsync.is_closed() {
            return Err(NodeError::Closed);
        }
        let result = self.store.put(ModePut::Upload, chunk).await?;
        tracing::debug!(base = %self.base, address = %chunk.address(), ?result, "chunk uploaded");
        Ok(result)
    }

    /// Upload a chunk and push it right away instead of waiting for the
    /// worker.
    pub async fn upload_and_push(&self, chunk: &Chunk) -> Result<()> {
        self.upload(chunk).await?;
        self.pushsync.push_chunk(chunk).await?;
        Ok(())
    }

    pub async fn get(&self, address: &Address) -> Result<Option<Chunk>> {
        Ok(self.store.get(address).await?)
    }

    pub async fn sync_state(&self, address: &Address) -> Result<Option<SyncState>> {
        Ok(self.store.sync_state(address).await?)
    }

    /// Number of uploaded chunks still waiting to be pushed.
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.store.pending_count().await?)
    }

    /// Add `peer` to the routing table.
    pub fn connect(&self, peer: Address) -> bool {
        self.topology.connect(peer)
    }

    /// Remove `peer` from the routing table.
    pub fn disconnect(&self, peer: &Address) -> bool {
        self.topology.disconnect(peer)
    }

    /// Register this node's push-sync metrics with `registry`.
    pub fn register_metrics(&self, registry: &Registry) -> Result<()> {
        self.pushsync.metrics().register(registry)?;
        Ok(())
    }

    /// Stop the worker, cancel in-flight transfers and leave the network.
    pub async fn close(&self) {
        self.pushsync.close().await;
        self.network.unregister(&self.base);
        tracing::info!(base = %self.base, "node closed");
    }

    pub fn base(&self) -> &Address {
        &self.base
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn topology(&self) -> &ProximityTable {
        &self.topology
    }

    pub fn pushsync(&self) -> &NodePushSync {
        &self.pushsync
    }

    pub fn metrics(&self) -> &PushSyncMetrics {
        self.pushsync.metrics()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // the network holds our handler, which holds the network
        self.network.unregister(&self.base);
    }
}

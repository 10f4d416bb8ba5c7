//! # Swarmsync
//!
//! Push synchronization for a content-addressed overlay.
//!
//! ## Overview
//!
//! A node that uploads a chunk pushes it toward the node whose overlay
//! address is closest to the chunk's address. Every hop stores the chunk,
//! answers with a receipt, and forwards it further if it knows a closer
//! peer. Chunks that fail to go out stay pending and are retried by a
//! periodic sweep.
//!
//! - **Store**: chunk persistence with a push index of pending uploads
//! - **Topology**: XOR-distance routing to the closest known peer
//! - **PushSync**: the delivery/receipt protocol, its worker and metrics
//! - **Node**: all of the above wired onto an in-process network
//!
//! ## Usage
//!
//! ```rust,no_run
//! use swarmsync::{MemoryNetwork, Node, NodeConfig};
//! use swarmsync::core::{Address, Chunk};
//!
//! async fn example() {
//!     let network = MemoryNetwork::new();
//!
//!     let a = Address::from_bytes([0x00; 32]);
//!     let b = Address::from_bytes([0x60; 32]);
//!     let node_a = Node::new(&NodeConfig::for_overlay(&a), network.clone()).unwrap();
//!     let node_b = Node::new(&NodeConfig::for_overlay(&b), network.clone()).unwrap();
//!     node_a.connect(b);
//!     node_b.connect(a);
//!     node_a.start();
//!     node_b.start();
//!
//!     let chunk = Chunk::new(Address::from_bytes([0x70; 32]), &b"hello"[..]).unwrap();
//!     node_a.upload(&chunk).await.unwrap();
//!
//!     node_a.close().await;
//!     node_b.close().await;
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `swarmsync::core` - addresses, chunks and proximity
//! - `swarmsync::store` - the `Store` trait, memory and SQLite stores
//! - `swarmsync::topology` - routing
//! - `swarmsync::pushsync` - the protocol itself

pub mod config;
pub mod error;
pub mod node;

pub use swarmsync_core as core;
pub use swarmsync_pushsync as pushsync;
pub use swarmsync_store as store;
pub use swarmsync_topology as topology;

pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use node::{Node, NodePushSync};

pub use swarmsync_core::{Address, Chunk};
pub use swarmsync_pushsync::{MemoryNetwork, PushSyncConfig, PushSyncError};
pub use swarmsync_store::{ModePut, PutResult, Store, SyncState};

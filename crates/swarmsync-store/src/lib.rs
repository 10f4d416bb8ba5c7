//! # Swarmsync Store
//!
//! Local chunk storage for swarmsync. Provides the [`Store`] trait consumed
//! by the push-sync protocol, with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store owns each chunk's synchronization state:
//!
//! - Chunks put with [`ModePut::Upload`] are **pending** and enter the push
//!   index, in insertion order.
//! - Chunks put with [`ModePut::Sync`] arrived from a peer; they are
//!   **received** and never enter the push index.
//! - [`Store::set_synced`] moves a chunk to **synced** and drops it from the
//!   push index.
//!
//! [`Store::subscribe_push`] returns a live feed over the push index. The feed
//! starts at the beginning of the pending set, waits for new uploads once it
//! reaches the end, and stops when unsubscribed or dropped. Subscribing again
//! starts a fresh pass from the beginning.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use swarmsync_core::{Address, Chunk};
//! use swarmsync_store::{MemoryStore, ModePut, Store};
//!
//! async fn example() {
//!     let store = MemoryStore::new();
//!     let chunk = Chunk::new(Address::ZERO, &b"data"[..]).unwrap();
//!     store.put(ModePut::Upload, &chunk).await.unwrap();
//!
//!     let mut feed = store.subscribe_push().await.unwrap();
//!     while let Some(chunk) = feed.recv().await {
//!         store.set_synced(chunk.address()).await.unwrap();
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent puts**: storing an address that is already present returns
//!   `AlreadyExists` and leaves its state untouched.
//! - **Trusted addresses**: the store never rehashes chunk data.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod subscription;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use subscription::{spawn_push_feed, PushIndex, PushSubscription};
pub use traits::{ModePut, PutResult, Store, SyncState};

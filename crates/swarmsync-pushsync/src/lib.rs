//! # Swarmsync Push-Sync
//!
//! Moves locally produced chunks toward the nodes closest to their addresses.
//!
//! ## Overview
//!
//! Every node runs one [`PushSync`] instance with two execution paths:
//!
//! - **Worker**: drains the store's push feed one chunk at a time. For each
//!   chunk it asks routing for the closest peer; if that is the node itself
//!   the chunk is marked synced, otherwise it is delivered to the peer and
//!   marked synced once a receipt comes back.
//! - **Handler**: serves inbound push-sync streams. It stores the delivered
//!   chunk, answers with a receipt, and then routes the chunk again from its
//!   own position, forwarding it one hop further unless it is itself closest.
//!
//! Each hop only acknowledges its own persistence. The chain ends at the node
//! for which routing answers [`Route::WantSelf`](swarmsync_topology::Route).
//!
//! ## Message Flow
//!
//! ```text
//! Uploader            Hop                 Closest
//!   |--- Delivery ----->|                    |
//!   |<-- Receipt -------|                    |
//!   |                   |--- Delivery ------>|
//!   |                   |<-- Receipt --------|
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swarmsync_core::Address;
//! use swarmsync_pushsync::{MemoryNetwork, PushSync, PushSyncConfig};
//! use swarmsync_store::MemoryStore;
//! use swarmsync_topology::ProximityTable;
//!
//! async fn example() {
//!     let base = Address::ZERO;
//!     let network = MemoryNetwork::new();
//!     let pushsync = PushSync::new(
//!         base,
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(ProximityTable::new(base)),
//!         Arc::new(network.streamer(base)),
//!         PushSyncConfig::default(),
//!     )
//!     .unwrap();
//!
//!     network.register(base, pushsync.protocol());
//!     pushsync.start();
//!     // ...
//!     pushsync.close().await;
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Retries**: a chunk that fails `max_retries` transfers is skipped on
//!   its next attempt and its counter is reset. It stays pending in the store
//!   and comes back on a later sweep.
//! - **Receipts** always echo the chunk address; a mismatch fails the
//!   transfer.
//! - **Deadlines**: one `receipt_timeout` budget covers writing the delivery
//!   and reading the receipt.

pub mod codec;
pub mod config;
pub mod error;
mod handler;
pub mod messages;
pub mod metrics;
mod pushsync;
pub mod retry;
mod transfer;
pub mod transport;
mod worker;

pub use config::PushSyncConfig;
pub use error::{PushSyncError, Result};
pub use messages::{Delivery, Receipt, PROTOCOL_NAME, PROTOCOL_VERSION, STREAM_NAME};
pub use metrics::PushSyncMetrics;
pub use pushsync::PushSync;
pub use retry::{Attempt, Failure, RetryTracker};
pub use transport::{
    FramedStream, MemoryNetwork, MemoryStreamer, ProtocolSpec, Stream, StreamHandler, StreamSpec,
    Streamer, TransportError, MAX_FRAME_SIZE,
};

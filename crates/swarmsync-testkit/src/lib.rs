//! # Swarmsync Testkit
//!
//! Testing utilities for swarmsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Recorder**: a [`Streamer`](swarmsync_pushsync::Streamer) that captures
//!   every frame exchanged, for asserting exactly what went over the wire
//! - **Mock topology**: routing with a scripted answer
//! - **Fixtures**: scenario chunks, addresses and a ready-made push-sync node
//! - **Generators**: proptest strategies for addresses, chunks and overlays
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use swarmsync_store::{ModePut, Store};
//! use swarmsync_testkit::fixtures::{address, test_chunk, PushSyncFixture};
//! use swarmsync_testkit::{MockTopology, Recorder};
//!
//! async fn example() {
//!     let fixture = PushSyncFixture::new(
//!         address(0x00),
//!         MockTopology::want_self(),
//!         Recorder::new(address(0x00)),
//!     );
//!     let chunk = test_chunk();
//!     fixture.store.put(ModePut::Upload, &chunk).await.unwrap();
//!     fixture.pushsync.push_chunk(&chunk).await.unwrap();
//!     assert_eq!(fixture.recorder.stream_count(), 0);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod recorder;
pub mod topology;

pub use fixtures::PushSyncFixture;
pub use recorder::{Middleware, Record, Recorder, RecorderError};
pub use topology::MockTopology;

/// Install a `tracing` subscriber for tests, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

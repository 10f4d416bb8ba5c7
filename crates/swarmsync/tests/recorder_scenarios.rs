//! Push-sync scenarios observed through a recording streamer.
//!
//! Each test wires one or more push-sync instances through `Recorder`s and
//! asserts the exact messages that crossed each stream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use swarmsync::pushsync::{
    Delivery, PushSyncConfig, PushSyncError, Receipt, StreamHandler, TransportError,
    PROTOCOL_NAME, PROTOCOL_VERSION, STREAM_NAME,
};
use swarmsync::store::{ModePut, Store, SyncState};
use swarmsync::topology::TopologyError;
use swarmsync::{Address, Chunk};
use swarmsync_testkit::fixtures::{address, fast_config, test_chunk};
use swarmsync_testkit::{init_tracing, Middleware, MockTopology, PushSyncFixture, Recorder, Record};

const WAIT: Duration = Duration::from_secs(5);

/// A node that considers itself closest to everything.
fn closest_node(base: Address) -> PushSyncFixture {
    PushSyncFixture::new(base, MockTopology::want_self(), Recorder::new(base))
}

async fn wait_records(recorder: &Recorder, peer: &Address, count: usize) -> Vec<Record> {
    recorder
        .wait_records(peer, PROTOCOL_NAME, PROTOCOL_VERSION, STREAM_NAME, count, WAIT)
        .await
        .unwrap()
}

async fn wait_for_state(store: &dyn Store, address: &Address, want: SyncState) {
    tokio::time::timeout(WAIT, async {
        loop {
            if store.sync_state(address).await.unwrap() == Some(want) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{address} never reached {want:?}"));
}

fn assert_single_exchange(record: &Record, chunk: &Chunk) {
    let deliveries: Vec<Delivery> = record.sent_messages().unwrap();
    assert_eq!(deliveries, vec![Delivery::from_chunk(chunk)]);

    let receipts: Vec<Receipt> = record.received_messages().unwrap();
    assert_eq!(receipts, vec![Receipt::for_address(chunk.address())]);
}

#[tokio::test]
async fn test_send_chunk_and_receive_receipt() {
    init_tracing();
    let chunk = test_chunk();
    let closest = closest_node(address(0x60));
    let pivot = PushSyncFixture::new(
        address(0x00),
        MockTopology::closest(address(0x60)),
        Recorder::new(address(0x00)).with_protocol(closest.pushsync.protocol()),
    );

    pivot.store.put(ModePut::Upload, &chunk).await.unwrap();
    pivot.pushsync.push_chunk(&chunk).await.unwrap();

    let records = wait_records(&pivot.recorder, &address(0x60), 1).await;
    assert_eq!(records.len(), 1);
    assert_single_exchange(&records[0], &chunk);
    assert!(records[0].handler_error().is_none());

    assert_eq!(
        pivot.store.sync_state(chunk.address()).await.unwrap(),
        Some(SyncState::Synced)
    );
    assert_eq!(closest.store.get(chunk.address()).await.unwrap(), Some(chunk.clone()));
    wait_for_state(closest.store.as_ref(), chunk.address(), SyncState::Synced).await;

    assert_eq!(pivot.pushsync.metrics().chunks_sent.get(), 1);
    assert_eq!(pivot.pushsync.metrics().receipts_received.get(), 1);
    assert_eq!(closest.pushsync.metrics().receipts_sent.get(), 1);
}

#[tokio::test]
async fn test_closest_to_own_chunk_opens_no_stream() {
    let chunk = test_chunk();
    let pivot = closest_node(address(0x60));

    pivot.store.put(ModePut::Upload, &chunk).await.unwrap();
    pivot.pushsync.push_chunk(&chunk).await.unwrap();

    assert_eq!(pivot.recorder.stream_count(), 0);
    assert_eq!(
        pivot.store.sync_state(chunk.address()).await.unwrap(),
        Some(SyncState::Synced)
    );
}

#[tokio::test]
async fn test_handler_forwards_to_closest_peer() {
    init_tracing();
    let chunk = test_chunk();
    let closest = closest_node(address(0x60));
    let pivot = PushSyncFixture::new(
        address(0x40),
        MockTopology::closest(address(0x60)),
        Recorder::new(address(0x40)).with_protocol(closest.pushsync.protocol()),
    );
    let upstream = PushSyncFixture::new(
        address(0x00),
        MockTopology::closest(address(0x40)),
        Recorder::new(address(0x00)).with_protocol(pivot.pushsync.protocol()),
    );

    upstream.store.put(ModePut::Upload, &chunk).await.unwrap();
    upstream.pushsync.push_chunk(&chunk).await.unwrap();

    // the pivot acknowledged upstream ...
    let records = wait_records(&upstream.recorder, &address(0x40), 1).await;
    assert_single_exchange(&records[0], &chunk);

    // ... and pushed the chunk on to the closest node
    let records = wait_records(&pivot.recorder, &address(0x60), 1).await;
    assert_single_exchange(&records[0], &chunk);

    wait_for_state(pivot.store.as_ref(), chunk.address(), SyncState::Synced).await;
    wait_for_state(closest.store.as_ref(), chunk.address(), SyncState::Synced).await;
    assert_eq!(pivot.pushsync.metrics().chunks_received.get(), 1);
    assert_eq!(pivot.pushsync.metrics().chunks_sent.get(), 1);
}

#[tokio::test]
async fn test_closest_node_keeps_chunk() {
    let chunk = test_chunk();
    let pivot = closest_node(address(0x60));
    let upstream = PushSyncFixture::new(
        address(0x00),
        MockTopology::closest(address(0x60)),
        Recorder::new(address(0x00)).with_protocol(pivot.pushsync.protocol()),
    );

    upstream.store.put(ModePut::Upload, &chunk).await.unwrap();
    upstream.pushsync.push_chunk(&chunk).await.unwrap();
    wait_records(&upstream.recorder, &address(0x60), 1).await;

    wait_for_state(pivot.store.as_ref(), chunk.address(), SyncState::Synced).await;
    assert_eq!(pivot.recorder.stream_count(), 0);
    assert_eq!(pivot.topology.calls(), 1);
}

#[tokio::test]
async fn test_forward_failure_still_acknowledges() {
    let chunk = test_chunk();
    // routes onward to a peer nobody serves
    let pivot = PushSyncFixture::new(
        address(0x40),
        MockTopology::closest(address(0x60)),
        Recorder::new(address(0x40)),
    );
    let upstream = PushSyncFixture::new(
        address(0x00),
        MockTopology::closest(address(0x40)),
        Recorder::new(address(0x00)).with_protocol(pivot.pushsync.protocol()),
    );

    upstream.store.put(ModePut::Upload, &chunk).await.unwrap();
    upstream.pushsync.push_chunk(&chunk).await.unwrap();

    let records = wait_records(&upstream.recorder, &address(0x40), 1).await;
    assert_single_exchange(&records[0], &chunk);
    assert!(records[0].handler_error().is_none());

    wait_for_state(pivot.store.as_ref(), chunk.address(), SyncState::Synced).await;
    assert_eq!(pivot.pushsync.metrics().send_errors.get(), 1);
}

#[tokio::test]
async fn test_routing_error_after_receipt() {
    let chunk = test_chunk();
    let pivot = PushSyncFixture::new(
        address(0x40),
        MockTopology::failing(TopologyError::NotFound),
        Recorder::new(address(0x40)),
    );
    let upstream = PushSyncFixture::new(
        address(0x00),
        MockTopology::closest(address(0x40)),
        Recorder::new(address(0x00)).with_protocol(pivot.pushsync.protocol()),
    );

    upstream.store.put(ModePut::Upload, &chunk).await.unwrap();
    upstream.pushsync.push_chunk(&chunk).await.unwrap();

    let records = wait_records(&upstream.recorder, &address(0x40), 1).await;
    assert_single_exchange(&records[0], &chunk);
    assert!(records[0].handler_error().is_some());

    // stored and acknowledged, but never settled
    assert_eq!(
        pivot.store.sync_state(chunk.address()).await.unwrap(),
        Some(SyncState::Received)
    );
    assert_eq!(pivot.pushsync.metrics().receive_errors.get(), 1);
}

#[tokio::test]
async fn test_routing_error_leaves_upload_pending() {
    let chunk = test_chunk();
    let pivot = PushSyncFixture::new(
        address(0x00),
        MockTopology::failing(TopologyError::NotFound),
        Recorder::new(address(0x00)),
    );

    pivot.store.put(ModePut::Upload, &chunk).await.unwrap();
    let err = pivot.pushsync.push_chunk(&chunk).await.unwrap_err();

    assert!(matches!(err, PushSyncError::Topology(TopologyError::NotFound)));
    assert_eq!(pivot.recorder.stream_count(), 0);
    assert_eq!(pivot.store.pending_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_retry_exhaustion_leaves_chunk_pending() {
    let chunk = test_chunk();
    let config = PushSyncConfig {
        max_retries: 2,
        ..fast_config()
    };
    // no handler anywhere: every stream open fails
    let pivot = PushSyncFixture::with_config(
        address(0x00),
        MockTopology::closest(address(0x60)),
        Recorder::new(address(0x00)),
        config,
    );
    pivot.store.put(ModePut::Upload, &chunk).await.unwrap();

    for _ in 0..2 {
        let err = pivot.pushsync.push_chunk(&chunk).await.unwrap_err();
        assert!(matches!(
            err,
            PushSyncError::Transport(TransportError::NoHandler { .. })
        ));
    }
    let err = pivot.pushsync.push_chunk(&chunk).await.unwrap_err();
    assert!(matches!(err, PushSyncError::RetryExhausted { .. }));

    assert_eq!(pivot.pushsync.metrics().send_errors.get(), 2);
    assert_eq!(pivot.pushsync.metrics().retries_exhausted.get(), 1);
    assert!(pivot.pushsync.retry_tracker().is_empty());
    assert_eq!(
        pivot.store.sync_state(chunk.address()).await.unwrap(),
        Some(SyncState::Pending)
    );

    // the budget starts over after exhaustion
    let err = pivot.pushsync.push_chunk(&chunk).await.unwrap_err();
    assert!(matches!(err, PushSyncError::Transport(_)));
    assert_eq!(pivot.pushsync.retry_tracker().attempts(chunk.address()), Some(1));
}

#[tokio::test]
async fn test_middleware_wraps_inbound_handlers() {
    let chunk = test_chunk();
    let closest = closest_node(address(0x60));

    let wrapped = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&wrapped);
    let middleware: Middleware = Arc::new(move |handler: Arc<dyn StreamHandler>| {
        counter.fetch_add(1, Ordering::SeqCst);
        handler
    });

    let pivot = PushSyncFixture::new(
        address(0x00),
        MockTopology::closest(address(0x60)),
        Recorder::new(address(0x00))
            .with_protocol(closest.pushsync.protocol())
            .with_middleware(middleware),
    );

    pivot.store.put(ModePut::Upload, &chunk).await.unwrap();
    pivot.pushsync.push_chunk(&chunk).await.unwrap();

    wait_records(&pivot.recorder, &address(0x60), 1).await;
    assert_eq!(wrapped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_worker_pushes_uploads_through_recorder() {
    let closest = closest_node(address(0x60));
    let pivot = PushSyncFixture::new(
        address(0x00),
        MockTopology::closest(address(0x60)),
        Recorder::new(address(0x00)).with_protocol(closest.pushsync.protocol()),
    );
    pivot.pushsync.start();

    let chunks: Vec<Chunk> = (0x70..0x74)
        .map(|first| swarmsync_testkit::fixtures::chunk_at(address(first), b"data"))
        .collect();
    for chunk in &chunks {
        pivot.store.put(ModePut::Upload, chunk).await.unwrap();
    }

    let records = wait_records(&pivot.recorder, &address(0x60), chunks.len()).await;
    assert_eq!(records.len(), chunks.len());
    for chunk in &chunks {
        wait_for_state(pivot.store.as_ref(), chunk.address(), SyncState::Synced).await;
    }
    assert_eq!(pivot.store.pending_count().await.unwrap(), 0);

    pivot.pushsync.close().await;
}

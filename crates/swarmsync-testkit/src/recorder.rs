//! A recording [`Streamer`] for protocol tests.
//!
//! Every stream opened through a [`Recorder`] is captured as a [`Record`]:
//! the frames the opener wrote, the frames the far end wrote back, and how
//! the exchange ended. The far end is either a registered protocol handler
//! (optionally wrapped in middleware) or nothing, in which case opening the
//! stream fails like a peer that does not speak the protocol.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use swarmsync_core::Address;
//! use swarmsync_pushsync::{Delivery, PROTOCOL_NAME, PROTOCOL_VERSION, STREAM_NAME};
//! use swarmsync_testkit::Recorder;
//!
//! async fn example(protocol: swarmsync_pushsync::ProtocolSpec, peer: Address) {
//!     let recorder = Arc::new(Recorder::new(Address::ZERO).with_protocol(protocol));
//!     // ... drive a PushSync instance that uses `recorder` as its streamer ...
//!     let records = recorder
//!         .wait_records(&peer, PROTOCOL_NAME, PROTOCOL_VERSION, STREAM_NAME, 1, Duration::from_secs(1))
//!         .await
//!         .unwrap();
//!     let deliveries: Vec<Delivery> = records[0].sent_messages().unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Notify;

use swarmsync_core::Address;
use swarmsync_pushsync::codec;
use swarmsync_pushsync::{
    FramedStream, ProtocolSpec, PushSyncError, Stream, StreamHandler, Streamer, TransportError,
    MAX_FRAME_SIZE,
};

/// Wraps a handler, e.g. to observe or perturb inbound streams.
pub type Middleware = Arc<dyn Fn(Arc<dyn StreamHandler>) -> Arc<dyn StreamHandler> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    peer: Address,
    protocol: String,
    version: String,
    stream: String,
}

#[derive(Debug, Default)]
struct RecordState {
    sent: Vec<Bytes>,
    received: Vec<Bytes>,
    opener_closed: bool,
    handler_done: bool,
    handler_error: Option<String>,
}

/// One recorded stream.
#[derive(Clone, Default)]
pub struct Record {
    state: Arc<Mutex<RecordState>>,
}

impl Record {
    fn lock(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Frames written by the opener.
    pub fn sent(&self) -> Vec<Bytes> {
        self.lock().sent.clone()
    }

    /// Frames written back by the far end.
    pub fn received(&self) -> Vec<Bytes> {
        self.lock().received.clone()
    }

    /// Decode every frame the opener wrote.
    pub fn sent_messages<T: DeserializeOwned>(&self) -> Result<Vec<T>, PushSyncError> {
        self.sent().iter().map(|f| codec::decode(f)).collect()
    }

    /// Decode every frame the far end wrote.
    pub fn received_messages<T: DeserializeOwned>(&self) -> Result<Vec<T>, PushSyncError> {
        self.received().iter().map(|f| codec::decode(f)).collect()
    }

    /// The handler's error, if it returned one.
    pub fn handler_error(&self) -> Option<String> {
        self.lock().handler_error.clone()
    }

    /// Both the opener and the handler are finished with the stream.
    pub fn is_complete(&self) -> bool {
        let state = self.lock();
        state.opener_closed && state.handler_done
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Record")
            .field("sent", &state.sent.len())
            .field("received", &state.received.len())
            .field("opener_closed", &state.opener_closed)
            .field("handler_done", &state.handler_done)
            .field("handler_error", &state.handler_error)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Opener,
    Handler,
}

/// Copies every written frame into the shared record.
struct RecordingStream {
    inner: Box<dyn Stream>,
    record: Record,
    side: Side,
    notify: Arc<Notify>,
}

#[async_trait]
impl Stream for RecordingStream {
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), TransportError> {
        self.inner.write_frame(frame.clone()).await?;
        {
            let mut state = self.record.lock();
            match self.side {
                Side::Opener => state.sent.push(frame),
                Side::Handler => state.received.push(frame),
            }
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<Bytes>, TransportError> {
        self.inner.read_frame().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let result = self.inner.close().await;
        if let Side::Opener = self.side {
            self.record.lock().opener_closed = true;
            self.notify.notify_waiters();
        }
        result
    }
}

impl Drop for RecordingStream {
    fn drop(&mut self) {
        // A dropped opener stream is closed as far as the peer can tell.
        if let Side::Opener = self.side {
            self.record.lock().opener_closed = true;
            self.notify.notify_waiters();
        }
    }
}

/// Errors from [`Recorder::wait_records`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    /// Fewer complete records than wanted arrived in time.
    #[error("timed out waiting for {wanted} records, got {got}")]
    Timeout { wanted: usize, got: usize },
}

/// A [`Streamer`] that records every stream it opens.
pub struct Recorder {
    base: Address,
    protocols: Vec<ProtocolSpec>,
    peer_protocols: HashMap<Address, Vec<ProtocolSpec>>,
    middleware: Vec<Middleware>,
    records: Mutex<HashMap<StreamKey, Vec<Record>>>,
    notify: Arc<Notify>,
}

impl Recorder {
    /// A recorder opening streams on behalf of `base`.
    pub fn new(base: Address) -> Self {
        Self {
            base,
            protocols: Vec::new(),
            peer_protocols: HashMap::new(),
            middleware: Vec::new(),
            records: Mutex::new(HashMap::new()),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Serve `protocol` at every peer.
    pub fn with_protocol(mut self, protocol: ProtocolSpec) -> Self {
        self.protocols.push(protocol);
        self
    }

    /// Serve `protocol` at `peer` only. Takes precedence over
    /// [`with_protocol`](Self::with_protocol).
    pub fn with_peer_protocol(mut self, peer: Address, protocol: ProtocolSpec) -> Self {
        self.peer_protocols.entry(peer).or_default().push(protocol);
        self
    }

    /// Wrap every handler. The first middleware added is the outermost.
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// The address handlers see as the opener.
    pub fn base(&self) -> &Address {
        &self.base
    }

    fn handler_for(
        &self,
        peer: &Address,
        protocol: &str,
        version: &str,
        stream: &str,
    ) -> Option<Arc<dyn StreamHandler>> {
        let find = |specs: &[ProtocolSpec]| {
            specs
                .iter()
                .find_map(|spec| spec.handler_for(protocol, version, stream))
        };
        let handler = self
            .peer_protocols
            .get(peer)
            .and_then(|specs| find(specs.as_slice()))
            .or_else(|| find(self.protocols.as_slice()))?;

        Some(
            self.middleware
                .iter()
                .rev()
                .fold(handler, |handler, middleware| middleware(handler)),
        )
    }

    /// Snapshot of the records for one stream identity, oldest first.
    pub fn records(&self, peer: &Address, protocol: &str, version: &str, stream: &str) -> Vec<Record> {
        let key = StreamKey {
            peer: *peer,
            protocol: protocol.to_string(),
            version: version.to_string(),
            stream: stream.to_string(),
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of streams opened, to any peer.
    pub fn stream_count(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Wait until at least `count` records for one stream identity are
    /// complete, then return all of them.
    pub async fn wait_records(
        &self,
        peer: &Address,
        protocol: &str,
        version: &str,
        stream: &str,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<Record>, RecorderError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let records = self.records(peer, protocol, version, stream);
            let complete = records.iter().filter(|r| r.is_complete()).count();
            if complete >= count {
                return Ok(records);
            }

            // Completion of a handler is not always signalled by a frame.
            let poll = tokio::time::sleep(Duration::from_millis(10));
            tokio::select! {
                _ = &mut notified => {}
                _ = poll => {}
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(RecorderError::Timeout { wanted: count, got: complete });
                }
            }
        }
    }
}

#[async_trait]
impl Streamer for Recorder {
    async fn new_stream(
        &self,
        peer: &Address,
        protocol: &str,
        version: &str,
        stream: &str,
    ) -> Result<Box<dyn Stream>, TransportError> {
        let handler = self
            .handler_for(peer, protocol, version, stream)
            .ok_or_else(|| TransportError::NoHandler {
                peer: *peer,
                protocol: protocol.to_string(),
                version: version.to_string(),
                stream: stream.to_string(),
            })?;

        let record = Record::default();
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(StreamKey {
                peer: *peer,
                protocol: protocol.to_string(),
                version: version.to_string(),
                stream: stream.to_string(),
            })
            .or_default()
            .push(record.clone());

        let (opener_end, handler_end) = tokio::io::duplex(4 * MAX_FRAME_SIZE);

        let handler_stream = RecordingStream {
            inner: Box::new(FramedStream::new(handler_end)),
            record: record.clone(),
            side: Side::Handler,
            notify: Arc::clone(&self.notify),
        };
        let opener = self.base;
        let notify = Arc::clone(&self.notify);
        let handler_record = record.clone();
        tokio::spawn(async move {
            let result = handler.handle(opener, Box::new(handler_stream)).await;
            {
                let mut state = handler_record.lock();
                state.handler_done = true;
                if let Err(e) = result {
                    state.handler_error = Some(e.to_string());
                }
            }
            notify.notify_waiters();
        });

        Ok(Box::new(RecordingStream {
            inner: Box::new(FramedStream::new(opener_end)),
            record,
            side: Side::Opener,
            notify: Arc::clone(&self.notify),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmsync_pushsync::StreamSpec;

    /// Answers each frame with its reverse, until the opener closes.
    struct Reverse;

    #[async_trait]
    impl StreamHandler for Reverse {
        async fn handle(&self, _peer: Address, mut stream: Box<dyn Stream>) -> Result<(), PushSyncError> {
            while let Some(frame) = stream.read_frame().await? {
                let reversed: Vec<u8> = frame.iter().rev().copied().collect();
                stream.write_frame(Bytes::from(reversed)).await?;
            }
            stream.close().await?;
            Ok(())
        }
    }

    fn reverse_spec() -> ProtocolSpec {
        ProtocolSpec {
            name: "rev".into(),
            version: "1".into(),
            streams: vec![StreamSpec {
                name: "rev".into(),
                handler: Arc::new(Reverse),
            }],
        }
    }

    #[tokio::test]
    async fn test_records_both_directions() {
        let peer = Address::from_bytes([0x60; 32]);
        let recorder = Recorder::new(Address::ZERO).with_protocol(reverse_spec());

        let mut stream = recorder.new_stream(&peer, "rev", "1", "rev").await.unwrap();
        stream.write_frame(Bytes::from_static(b"abc")).await.unwrap();
        assert_eq!(
            stream.read_frame().await.unwrap(),
            Some(Bytes::from_static(b"cba"))
        );
        stream.close().await.unwrap();

        let records = recorder
            .wait_records(&peer, "rev", "1", "rev", 1, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sent(), vec![Bytes::from_static(b"abc")]);
        assert_eq!(records[0].received(), vec![Bytes::from_static(b"cba")]);
        assert_eq!(records[0].handler_error(), None);
    }

    #[tokio::test]
    async fn test_unknown_protocol_is_not_recorded() {
        let peer = Address::from_bytes([0x60; 32]);
        let recorder = Recorder::new(Address::ZERO);

        let err = recorder.new_stream(&peer, "rev", "1", "rev").await.err();
        assert!(matches!(err, Some(TransportError::NoHandler { .. })));
        assert_eq!(recorder.stream_count(), 0);
    }

    #[tokio::test]
    async fn test_peer_protocol_and_middleware() {
        let peer = Address::from_bytes([0x60; 32]);
        let other = Address::from_bytes([0x80; 32]);
        let wrapped = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&wrapped);

        let recorder = Recorder::new(Address::ZERO)
            .with_peer_protocol(peer, reverse_spec())
            .with_middleware(Arc::new(move |handler: Arc<dyn StreamHandler>| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                handler
            }));

        assert!(recorder.new_stream(&peer, "rev", "1", "rev").await.is_ok());
        assert!(recorder.new_stream(&other, "rev", "1", "rev").await.is_err());
        assert_eq!(wrapped.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_records_times_out() {
        let peer = Address::from_bytes([0x60; 32]);
        let recorder = Recorder::new(Address::ZERO).with_protocol(reverse_spec());

        let err = recorder
            .wait_records(&peer, "rev", "1", "rev", 1, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, RecorderError::Timeout { wanted: 1, got: 0 });
    }
}

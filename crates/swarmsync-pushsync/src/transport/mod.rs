//! Stream transport abstraction.
//!
//! Push-sync talks to peers over short-lived bidirectional streams, each
//! carrying one length-delimited message in each direction. The transport
//! opens outbound streams ([`Streamer`]) and dispatches inbound ones to the
//! handler registered for their protocol identity ([`ProtocolSpec`]).
//!
//! Implementations may sit on any byte pipe. [`memory::MemoryNetwork`] wires
//! nodes together in-process.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use swarmsync_core::Address;

use crate::error::PushSyncError;

pub mod framed;
pub mod memory;

pub use framed::{FramedStream, MAX_FRAME_SIZE};
pub use memory::{MemoryNetwork, MemoryStreamer};

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying pipe failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame exceeded the size limit.
    #[error("frame larger than {max} bytes")]
    FrameTooLarge { max: usize },

    /// The peer is not reachable on this transport.
    #[error("peer not found: {0}")]
    PeerNotFound(Address),

    /// The peer does not serve this protocol/stream.
    #[error("no handler for {protocol}/{version}/{stream} at {peer}")]
    NoHandler {
        peer: Address,
        protocol: String,
        version: String,
        stream: String,
    },

    /// The stream was already closed locally.
    #[error("stream closed")]
    Closed,
}

/// A bidirectional message stream to one peer.
#[async_trait]
pub trait Stream: Send {
    /// Write one frame.
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), TransportError>;

    /// Read one frame. `None` means the peer closed its side cleanly.
    async fn read_frame(&mut self) -> Result<Option<Bytes>, TransportError>;

    /// Close the local side. Idempotent.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens outbound streams.
#[async_trait]
pub trait Streamer: Send + Sync {
    /// Open a new stream to `peer` under the given protocol identity.
    async fn new_stream(
        &self,
        peer: &Address,
        protocol: &str,
        version: &str,
        stream: &str,
    ) -> Result<Box<dyn Stream>, TransportError>;
}

#[async_trait]
impl<T: Streamer + ?Sized> Streamer for Arc<T> {
    async fn new_stream(
        &self,
        peer: &Address,
        protocol: &str,
        version: &str,
        stream: &str,
    ) -> Result<Box<dyn Stream>, TransportError> {
        (**self).new_stream(peer, protocol, version, stream).await
    }
}

/// Serves inbound streams of one protocol identity.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    /// Handle one inbound stream opened by `peer`.
    async fn handle(&self, peer: Address, stream: Box<dyn Stream>) -> Result<(), PushSyncError>;
}

/// A named stream within a protocol and the handler serving it.
#[derive(Clone)]
pub struct StreamSpec {
    pub name: String,
    pub handler: Arc<dyn StreamHandler>,
}

/// Everything a transport needs to serve a protocol.
#[derive(Clone)]
pub struct ProtocolSpec {
    pub name: String,
    pub version: String,
    pub streams: Vec<StreamSpec>,
}

impl ProtocolSpec {
    /// The handler for `(protocol, version, stream)`, if this spec serves it.
    pub fn handler_for(
        &self,
        protocol: &str,
        version: &str,
        stream: &str,
    ) -> Option<Arc<dyn StreamHandler>> {
        if self.name != protocol || self.version != version {
            return None;
        }
        self.streams
            .iter()
            .find(|s| s.name == stream)
            .map(|s| Arc::clone(&s.handler))
    }
}

impl std::fmt::Debug for ProtocolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolSpec")
            .field("name", &self.name)
            .field("version", &self.version)
            .field(
                "streams",
                &self.streams.iter().map(|s| &s.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

//! In-process transport for tests and single-process networks.
//!
//! Every stream is a `tokio::io::duplex` pipe with [`FramedStream`] on both
//! ends. Opening a stream spawns the remote node's registered handler on the
//! far end.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use swarmsync_core::Address;

use super::{FramedStream, ProtocolSpec, Stream, Streamer, TransportError, MAX_FRAME_SIZE};

/// Buffer size of each duplex pipe.
const PIPE_CAPACITY: usize = 4 * MAX_FRAME_SIZE;

/// Shared routing table of the in-process network.
#[derive(Default)]
pub struct MemoryNetwork {
    nodes: RwLock<HashMap<Address, Vec<ProtocolSpec>>>,
}

impl MemoryNetwork {
    /// Create a new memory network.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `protocol` at `node`. A node may serve several protocols.
    pub fn register(&self, node: Address, protocol: ProtocolSpec) {
        tracing::debug!(node = %node, protocol = %protocol.name, version = %protocol.version, "protocol registered");
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(node)
            .or_default()
            .push(protocol);
    }

    /// Remove `node` from the network. Streams already open keep running.
    pub fn unregister(&self, node: &Address) -> bool {
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(node)
            .is_some()
    }

    /// Whether `node` is registered.
    pub fn contains(&self, node: &Address) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(node)
    }

    /// A streamer that opens streams on behalf of `local`.
    pub fn streamer(self: &Arc<Self>, local: Address) -> MemoryStreamer {
        MemoryStreamer {
            local,
            network: Arc::clone(self),
        }
    }
}

/// Opens streams from one node into a [`MemoryNetwork`].
#[derive(Clone)]
pub struct MemoryStreamer {
    local: Address,
    network: Arc<MemoryNetwork>,
}

impl MemoryStreamer {
    /// The node this streamer opens streams for.
    pub fn local(&self) -> &Address {
        &self.local
    }
}

#[async_trait]
impl Streamer for MemoryStreamer {
    async fn new_stream(
        &self,
        peer: &Address,
        protocol: &str,
        version: &str,
        stream: &str,
    ) -> Result<Box<dyn Stream>, TransportError> {
        let handler = {
            let nodes = self
                .network
                .nodes
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let specs = nodes
                .get(peer)
                .ok_or(TransportError::PeerNotFound(*peer))?;
            specs
                .iter()
                .find_map(|spec| spec.handler_for(protocol, version, stream))
                .ok_or_else(|| TransportError::NoHandler {
                    peer: *peer,
                    protocol: protocol.to_string(),
                    version: version.to_string(),
                    stream: stream.to_string(),
                })?
        };

        let (local_end, remote_end) = tokio::io::duplex(PIPE_CAPACITY);
        let opener = self.local;
        let target = *peer;

        tokio::spawn(async move {
            if let Err(e) = handler
                .handle(opener, Box::new(FramedStream::new(remote_end)))
                .await
            {
                tracing::debug!(node = %target, peer = %opener, error = %e, "stream handler failed");
            }
        });

        Ok(Box::new(FramedStream::new(local_end)))
    }
}

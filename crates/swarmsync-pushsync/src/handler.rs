//! Inbound delivery handling.
//!
//! One invocation per inbound stream: store the chunk, acknowledge it, then
//! keep it moving toward its closest node. The receipt goes out before any
//! forwarding decision, so the sender only ever learns that this hop has the
//! chunk.

use async_trait::async_trait;

use swarmsync_core::{Address, Chunk};
use swarmsync_store::{ModePut, Store};
use swarmsync_topology::{ClosestPeerer, Route};

use crate::codec::{read_message, write_message};
use crate::error::Result;
use crate::messages::{Delivery, Receipt};
use crate::pushsync::Shared;
use crate::transport::{Stream, StreamHandler, Streamer};

#[async_trait]
impl<S, P, N> StreamHandler for Shared<S, P, N>
where
    S: Store + ?Sized + 'static,
    P: ClosestPeerer + ?Sized + 'static,
    N: Streamer + ?Sized + 'static,
{
    async fn handle(&self, peer: Address, mut stream: Box<dyn Stream>) -> Result<()> {
        let result = self.handle_delivery(&peer, stream.as_mut()).await;

        if let Err(e) = stream.close().await {
            tracing::debug!(peer = %peer, error = %e, "pushsync: closing inbound stream failed");
        }

        if let Err(e) = &result {
            self.metrics.receive_errors.inc();
            tracing::debug!(peer = %peer, error = %e, "pushsync: inbound delivery failed");
        }

        result
    }
}

impl<S, P, N> Shared<S, P, N>
where
    S: Store + ?Sized,
    P: ClosestPeerer + ?Sized,
    N: Streamer + ?Sized,
{
    async fn handle_delivery(&self, peer: &Address, stream: &mut dyn Stream) -> Result<()> {
        let delivery: Delivery = match read_message(stream).await? {
            Some(delivery) => delivery,
            // peer closed without sending anything
            None => return Ok(()),
        };
        let chunk = delivery.into_chunk()?;
        self.metrics.chunks_received.inc();

        self.store.put(ModePut::Sync, &chunk).await?;

        write_message(stream, &Receipt::for_address(chunk.address())).await?;
        self.metrics.receipts_sent.inc();

        tracing::debug!(address = %chunk.address(), peer = %peer, "pushsync: chunk received");

        self.settle_received(chunk).await
    }

    /// Decide the next hop for a chunk this node has already acknowledged.
    async fn settle_received(&self, chunk: Chunk) -> Result<()> {
        let address = *chunk.address();

        match self.topology.closest_peer(&address)? {
            Route::WantSelf => {
                tracing::debug!(address = %address, "pushsync: chunk arrived at closest node");
            }
            Route::Peer(next) => {
                // The receipt is already out; a failed forward does not retract it.
                if let Err(e) = self.push_to_peer(&next, &chunk).await {
                    tracing::debug!(address = %address, peer = %next, error = %e, "pushsync: forward failed");
                }
            }
        }

        self.mark_synced(&address).await
    }
}

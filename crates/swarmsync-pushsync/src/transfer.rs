//! Point-to-point transfer: one delivery out, one receipt back.
//!
//! Shared by the worker (locally uploaded chunks) and by the handler
//! (forwarding received chunks to the next hop).

use std::time::Instant;

use swarmsync_core::{Address, Chunk};
use swarmsync_store::Store;
use swarmsync_topology::ClosestPeerer;

use crate::codec::{read_message, write_message};
use crate::error::{PushSyncError, Result};
use crate::messages::{Delivery, Receipt, PROTOCOL_NAME, PROTOCOL_VERSION, STREAM_NAME};
use crate::pushsync::{shutdown_signal, Shared};
use crate::retry::{Attempt, Failure};
use crate::transport::{Stream, Streamer};

impl<S, P, N> Shared<S, P, N>
where
    S: Store + ?Sized,
    P: ClosestPeerer + ?Sized,
    N: Streamer + ?Sized,
{
    /// Deliver `chunk` to `peer` and wait for its receipt.
    ///
    /// Fails without touching the network once the chunk has used up its
    /// retry budget. Any other failure is counted against that budget.
    pub(crate) async fn push_to_peer(&self, peer: &Address, chunk: &Chunk) -> Result<()> {
        let address = *chunk.address();

        if self.retry.begin_attempt(&address) == Attempt::Exceeded {
            self.metrics.retries_exhausted.inc();
            tracing::warn!(address = %address, peer = %peer, "pushsync: retries exhausted, skipping");
            return Err(PushSyncError::RetryExhausted { address });
        }

        let mut shutdown = self.shutdown.subscribe();
        let result = tokio::select! {
            biased;
            _ = shutdown_signal(&mut shutdown) => Err(PushSyncError::Cancelled),
            result = self.deliver(peer, chunk) => result,
        };

        match &result {
            Ok(()) => self.retry.record_success(&address),
            Err(e) => {
                match self.retry.record_failure(&address) {
                    Failure::Retry(attempts) => {
                        tracing::debug!(
                            address = %address,
                            peer = %peer,
                            attempts,
                            error = %e,
                            "pushsync: transfer failed"
                        );
                    }
                    Failure::Exhausted => {
                        self.metrics.retries_exhausted.inc();
                        tracing::warn!(
                            address = %address,
                            peer = %peer,
                            error = %e,
                            "pushsync: transfer failed, retries exhausted"
                        );
                    }
                }
            }
        }

        result
    }

    async fn deliver(&self, peer: &Address, chunk: &Chunk) -> Result<()> {
        let mut stream = match self
            .streamer
            .new_stream(peer, PROTOCOL_NAME, PROTOCOL_VERSION, STREAM_NAME)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                self.metrics.send_errors.inc();
                return Err(e.into());
            }
        };

        let deadline = self.config.receipt_timeout;
        let mut delivered = false;
        let exchange = self.exchange(stream.as_mut(), chunk, &mut delivered);
        let result = match tokio::time::timeout(deadline, exchange).await {
            Ok(result) => result,
            Err(_) => Err(PushSyncError::Timeout(deadline)),
        };
        if result.is_err() {
            if delivered {
                self.metrics.receipt_errors.inc();
            } else {
                self.metrics.send_errors.inc();
            }
        }

        if let Err(e) = stream.close().await {
            tracing::debug!(peer = %peer, error = %e, "pushsync: closing stream failed");
        }

        result
    }

    /// Write the delivery and read the receipt. Both share one deadline.
    /// `delivered` is set once the delivery is written.
    async fn exchange(
        &self,
        stream: &mut dyn Stream,
        chunk: &Chunk,
        delivered: &mut bool,
    ) -> Result<()> {
        let started = Instant::now();

        write_message(stream, &Delivery::from_chunk(chunk)).await?;
        *delivered = true;
        self.metrics.chunks_sent.inc();

        let receipt: Receipt = read_message(stream)
            .await?
            .ok_or(PushSyncError::UnexpectedEof)?;
        receipt.verify(chunk.address())?;

        self.metrics.receipts_received.inc();
        self.metrics
            .receipt_rtt
            .observe(started.elapsed().as_secs_f64());
        Ok(())
    }
}

//! The push worker loop.
//!
//! A single sequential consumer of the store's push feed. Three events drive
//! it:
//!
//! - a chunk arrives on the live subscription: route and push it
//! - the subscription ends: restart it, after a short pause if it was empty
//! - the sweep timer fires: drop the subscription and open a fresh one
//!
//! A fresh subscription starts at the beginning of the pending set, so every
//! sweep rediscovers chunks whose earlier attempt failed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use swarmsync_core::Chunk;
use swarmsync_store::{PushSubscription, Store};
use swarmsync_topology::{ClosestPeerer, Route};

use crate::error::{PushSyncError, Result};
use crate::pushsync::{shutdown_signal, Shared};
use crate::transport::Streamer;

impl<S, P, N> Shared<S, P, N>
where
    S: Store + ?Sized,
    P: ClosestPeerer + ?Sized,
    N: Streamer + ?Sized,
{
    /// Run until shutdown.
    pub(crate) async fn run_worker(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut feed: Option<PushSubscription> = None;
        let mut batch = 0usize;
        let mut sweep_started = Instant::now();

        // Fires immediately for the first subscription.
        let timer = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(timer);

        tracing::debug!(base = %self.base, "pushsync: worker started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_signal(&mut shutdown) => break,

                next = next_chunk(&mut feed), if feed.is_some() => match next {
                    Some(chunk) => {
                        batch += 1;
                        self.metrics.total_to_send.inc();
                        self.sync_from_worker(&chunk).await;
                    }
                    None => {
                        feed = None;
                        self.metrics
                            .sweep_time
                            .observe(sweep_started.elapsed().as_secs_f64());
                        let delay = if batch == 0 {
                            self.config.empty_batch_delay
                        } else {
                            Duration::ZERO
                        };
                        timer
                            .as_mut()
                            .reset(tokio::time::Instant::now() + delay);
                    }
                },

                _ = &mut timer => {
                    if let Some(mut old) = feed.take() {
                        old.unsubscribe();
                        self.metrics
                            .sweep_time
                            .observe(sweep_started.elapsed().as_secs_f64());
                    }
                    match self.store.subscribe_push().await {
                        Ok(subscription) => {
                            feed = Some(subscription);
                            batch = 0;
                            sweep_started = Instant::now();
                            self.metrics.sweeps.inc();
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "pushsync: subscribing to push feed failed");
                        }
                    }
                    timer
                        .as_mut()
                        .reset(tokio::time::Instant::now() + self.config.retry_interval);
                }
            }
        }

        if let Some(mut feed) = feed {
            feed.unsubscribe();
        }
        tracing::debug!(base = %self.base, "pushsync: worker stopped");
    }

    async fn sync_from_worker(&self, chunk: &Chunk) {
        let started = Instant::now();
        match self.push_chunk(chunk).await {
            Ok(()) => {
                self.metrics
                    .send_time
                    .observe(started.elapsed().as_secs_f64());
            }
            // Left pending; the next sweep picks it up again.
            Err(e) if e.is_transport() => {
                tracing::debug!(address = %chunk.address(), error = %e, "pushsync: push failed");
            }
            Err(PushSyncError::Cancelled) => {}
            Err(e) => {
                tracing::warn!(address = %chunk.address(), error = %e, "pushsync: push failed");
            }
        }
    }

    /// Route `chunk` and either mark it synced or push it to its peer first.
    pub(crate) async fn push_chunk(&self, chunk: &Chunk) -> Result<()> {
        let address = chunk.address();

        match self.topology.closest_peer(address)? {
            Route::WantSelf => {
                tracing::debug!(address = %address, "pushsync: closest to own chunk");
            }
            Route::Peer(peer) => {
                self.push_to_peer(&peer, chunk).await?;
                tracing::debug!(address = %address, peer = %peer, "pushsync: chunk pushed");
            }
        }

        self.mark_synced(address).await
    }
}

async fn next_chunk(feed: &mut Option<PushSubscription>) -> Option<Chunk> {
    match feed {
        Some(feed) => feed.recv().await,
        None => std::future::pending().await,
    }
}

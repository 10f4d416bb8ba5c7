//! The push-sync service: lifecycle and protocol registration.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use swarmsync_core::{Address, Chunk};
use swarmsync_store::Store;
use swarmsync_topology::ClosestPeerer;

use crate::config::PushSyncConfig;
use crate::error::Result;
use crate::messages::{PROTOCOL_NAME, PROTOCOL_VERSION, STREAM_NAME};
use crate::metrics::PushSyncMetrics;
use crate::retry::RetryTracker;
use crate::transport::{ProtocolSpec, StreamHandler, StreamSpec, Streamer};

/// State shared by the worker, the stream handler and the public handle.
pub(crate) struct Shared<S: ?Sized, P: ?Sized, N: ?Sized> {
    pub(crate) base: Address,
    pub(crate) config: PushSyncConfig,
    pub(crate) retry: RetryTracker,
    pub(crate) metrics: PushSyncMetrics,
    /// Flips to `true` once on close.
    pub(crate) shutdown: watch::Sender<bool>,
    pub(crate) store: Arc<S>,
    pub(crate) topology: Arc<P>,
    pub(crate) streamer: Arc<N>,
}

impl<S, P, N> Shared<S, P, N>
where
    S: Store + ?Sized,
    P: ClosestPeerer + ?Sized,
    N: Streamer + ?Sized,
{
    pub(crate) async fn mark_synced(&self, address: &Address) -> Result<()> {
        match self.store.set_synced(address).await {
            Ok(()) => {
                self.metrics.chunks_synced.inc();
                Ok(())
            }
            Err(e) => {
                self.metrics.set_synced_errors.inc();
                Err(e.into())
            }
        }
    }
}

/// Resolves once shutdown has been signalled, or the sender is gone.
pub(crate) async fn shutdown_signal(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

/// A push-sync instance for one node.
///
/// Owns the retry tracker and metrics for its lifetime. Construct with
/// [`PushSync::new`], register [`PushSync::protocol`] with the transport,
/// then [`start`](PushSync::start) the worker.
pub struct PushSync<S: ?Sized, P: ?Sized, N: ?Sized> {
    shared: Arc<Shared<S, P, N>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S, P, N> PushSync<S, P, N>
where
    S: Store + ?Sized + 'static,
    P: ClosestPeerer + ?Sized + 'static,
    N: Streamer + ?Sized + 'static,
{
    /// Create a push-sync instance for the node at `base`.
    pub fn new(
        base: Address,
        store: Arc<S>,
        topology: Arc<P>,
        streamer: Arc<N>,
        config: PushSyncConfig,
    ) -> Result<Self> {
        let (shutdown, _) = watch::channel(false);
        let shared = Shared {
            base,
            retry: RetryTracker::new(config.max_retries),
            metrics: PushSyncMetrics::new()?,
            config,
            shutdown,
            store,
            topology,
            streamer,
        };
        Ok(Self {
            shared: Arc::new(shared),
            worker: Mutex::new(None),
        })
    }

    /// Start the worker loop. Does nothing if it is already running or the
    /// instance has been closed.
    pub fn start(&self) {
        if *self.shared.shutdown.borrow() {
            return;
        }
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_none() {
            *worker = Some(tokio::spawn(Arc::clone(&self.shared).run_worker()));
        }
    }

    /// The protocol to register with the transport for inbound deliveries.
    pub fn protocol(&self) -> ProtocolSpec {
        let handler: Arc<dyn StreamHandler> = self.shared.clone();
        ProtocolSpec {
            name: PROTOCOL_NAME.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            streams: vec![StreamSpec {
                name: STREAM_NAME.to_string(),
                handler,
            }],
        }
    }

    /// Push one chunk now, outside the worker: route it, transfer it if
    /// another node is closer, and mark it synced on success.
    pub async fn push_chunk(&self, chunk: &Chunk) -> Result<()> {
        self.shared.push_chunk(chunk).await
    }

    /// Signal shutdown and wait for the worker to stop.
    ///
    /// In-flight transfers, from the worker or from forwarding handlers,
    /// fail with [`Cancelled`](crate::PushSyncError::Cancelled).
    pub async fn close(&self) {
        self.shared.shutdown.send_replace(true);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "pushsync: worker task failed");
            }
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        *self.shared.shutdown.borrow()
    }

    /// The local node's overlay address.
    pub fn base(&self) -> &Address {
        &self.shared.base
    }

    pub fn config(&self) -> &PushSyncConfig {
        &self.shared.config
    }

    pub fn metrics(&self) -> &PushSyncMetrics {
        &self.shared.metrics
    }

    pub fn retry_tracker(&self) -> &RetryTracker {
        &self.shared.retry
    }
}

impl<S: ?Sized, P: ?Sized, N: ?Sized> Drop for PushSync<S, P, N> {
    fn drop(&mut self) {
        self.shared.shutdown.send_replace(true);
    }
}

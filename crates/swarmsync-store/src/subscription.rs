//! Live subscriptions over the push index.
//!
//! Both store backends share one feed task, and any other [`Store`](crate::Store)
//! can reuse it through [`spawn_push_feed`] or hand out its own channel
//! through [`PushSubscription::new`]. The task walks the push index
//! in sequence order from a cursor, handing chunks to the subscriber one at a
//! time over a bounded channel. Once it runs out of pending chunks it parks
//! on the store's upload trigger until something new arrives.

use async_trait::async_trait;
use swarmsync_core::Chunk;
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::Result;

/// A position-ordered view of the push index.
#[async_trait]
pub trait PushIndex: Send + Sync + 'static {
    /// The first pending chunk whose push sequence is greater than `after`.
    async fn next_pending(&self, after: Option<u64>) -> Result<Option<(u64, Chunk)>>;
}

/// A live, cancellable feed of pending chunks.
///
/// The feed ends (`recv` returns `None`) after [`unsubscribe`](Self::unsubscribe),
/// when the owning store is dropped, or when the store fails to read its
/// index. Dropping the subscription unsubscribes.
pub struct PushSubscription {
    chunks: mpsc::Receiver<Chunk>,
    stop: Option<oneshot::Sender<()>>,
}

impl PushSubscription {
    /// Wrap a chunk channel fed by the store.
    ///
    /// The feed ends once every sender of `chunks` is dropped. `stop` fires
    /// on unsubscribe; the producer may ignore it and watch for the
    /// receiver closing instead.
    pub fn new(chunks: mpsc::Receiver<Chunk>, stop: oneshot::Sender<()>) -> Self {
        Self {
            chunks,
            stop: Some(stop),
        }
    }

    /// Receive the next pending chunk.
    pub async fn recv(&mut self) -> Option<Chunk> {
        self.chunks.recv().await
    }

    /// Stop the feed. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.chunks.close();
    }

    /// Whether `unsubscribe` has been called.
    pub fn is_unsubscribed(&self) -> bool {
        self.stop.is_none()
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Spawn the feed task for `index`, woken by `trigger` on every upload.
pub fn spawn_push_feed<I: PushIndex>(
    index: I,
    mut trigger: watch::Receiver<u64>,
) -> PushSubscription {
    let (tx, rx) = mpsc::channel(1);
    let (stop_tx, mut stop_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut cursor: Option<u64> = None;

        loop {
            // Mark the trigger seen before reading, so an upload racing with
            // the read still wakes us below.
            trigger.borrow_and_update();

            let next = match index.next_pending(cursor).await {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!(error = %e, "push feed: reading push index failed");
                    return;
                }
            };

            match next {
                Some((seq, chunk)) => {
                    cursor = Some(seq);
                    tokio::select! {
                        sent = tx.send(chunk) => {
                            if sent.is_err() {
                                return;
                            }
                        }
                        _ = &mut stop_rx => return,
                    }
                }
                None => {
                    tokio::select! {
                        changed = trigger.changed() => {
                            if changed.is_err() {
                                tracing::debug!("push feed: store dropped");
                                return;
                            }
                        }
                        _ = tx.closed() => return,
                        _ = &mut stop_rx => return,
                    }
                }
            }
        }
    });

    PushSubscription::new(rx, stop_tx)
}

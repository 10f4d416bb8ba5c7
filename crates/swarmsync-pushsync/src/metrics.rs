//! Push-sync counters and timing histograms.
//!
//! Metrics are per instance and unregistered by default; call
//! [`PushSyncMetrics::register`] to expose them through a registry.

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

/// Latency buckets in seconds, from 1 ms up to the default receipt timeout.
const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0];

#[derive(Clone)]
pub struct PushSyncMetrics {
    pub total_to_send: IntCounter,
    pub chunks_sent: IntCounter,
    pub chunks_received: IntCounter,
    pub receipts_sent: IntCounter,
    pub receipts_received: IntCounter,
    pub send_errors: IntCounter,
    pub receipt_errors: IntCounter,
    pub receive_errors: IntCounter,
    pub retries_exhausted: IntCounter,
    pub chunks_synced: IntCounter,
    pub set_synced_errors: IntCounter,
    pub sweeps: IntCounter,

    pub send_time: Histogram,
    pub receipt_rtt: Histogram,
    pub sweep_time: Histogram,
}

fn counter(name: &str, help: &str) -> prometheus::Result<IntCounter> {
    IntCounter::new(format!("pushsync_{}", name), help)
}

fn histogram(name: &str, help: &str) -> prometheus::Result<Histogram> {
    Histogram::with_opts(
        HistogramOpts::new(format!("pushsync_{}", name), help).buckets(LATENCY_BUCKETS.to_vec()),
    )
}

impl PushSyncMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            total_to_send: counter("total_to_send", "Chunks taken from the push feed")?,
            chunks_sent: counter("chunks_sent", "Deliveries written to a peer")?,
            chunks_received: counter("chunks_received", "Deliveries read from a peer")?,
            receipts_sent: counter("receipts_sent", "Receipts written to a peer")?,
            receipts_received: counter("receipts_received", "Valid receipts read from a peer")?,
            send_errors: counter(
                "send_errors",
                "Outbound transfers that failed opening a stream or writing the delivery",
            )?,
            receipt_errors: counter(
                "receipt_errors",
                "Outbound transfers that failed reading or checking the receipt",
            )?,
            receive_errors: counter("receive_errors", "Failed inbound streams")?,
            retries_exhausted: counter(
                "retries_exhausted",
                "Transfers abandoned after too many failures",
            )?,
            chunks_synced: counter("chunks_synced", "Chunks marked synced")?,
            set_synced_errors: counter("set_synced_errors", "Failures marking a chunk synced")?,
            sweeps: counter("sweeps", "Subscriptions opened on the push feed")?,

            send_time: histogram("send_time_seconds", "Time to push one chunk from the worker")?,
            receipt_rtt: histogram(
                "receipt_rtt_seconds",
                "Round trip from writing a delivery to reading its receipt",
            )?,
            sweep_time: histogram("sweep_time_seconds", "Time spent draining one subscription")?,
        })
    }

    /// Register every metric with `registry`.
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        for c in [
            &self.total_to_send,
            &self.chunks_sent,
            &self.chunks_received,
            &self.receipts_sent,
            &self.receipts_received,
            &self.send_errors,
            &self.receipt_errors,
            &self.receive_errors,
            &self.retries_exhausted,
            &self.chunks_synced,
            &self.set_synced_errors,
            &self.sweeps,
        ] {
            registry.register(Box::new(c.clone()))?;
        }
        for h in [&self.send_time, &self.receipt_rtt, &self.sweep_time] {
            registry.register(Box::new(h.clone()))?;
        }
        Ok(())
    }
}

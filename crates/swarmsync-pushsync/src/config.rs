//! Push-sync tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between forced re-subscriptions to the push feed.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Default round-trip deadline for one delivery/receipt exchange.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of failed transfers tolerated per chunk.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause before re-subscribing after a sweep that found nothing.
pub const DEFAULT_EMPTY_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Configuration for a [`PushSync`](crate::PushSync) instance.
///
/// Durations are (de)serialized as integer milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushSyncConfig {
    /// Forced re-subscription interval, independent of feed closure.
    #[serde(with = "millis", rename = "retry_interval_ms")]
    pub retry_interval: Duration,

    /// Budget covering both the delivery write and the receipt read.
    #[serde(with = "millis", rename = "receipt_timeout_ms")]
    pub receipt_timeout: Duration,

    /// Failed transfers allowed before an attempt is abandoned.
    pub max_retries: u32,

    /// Debounce before restarting after an empty sweep.
    #[serde(with = "millis", rename = "empty_batch_delay_ms")]
    pub empty_batch_delay: Duration,
}

impl Default for PushSyncConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            empty_batch_delay: DEFAULT_EMPTY_BATCH_DELAY,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

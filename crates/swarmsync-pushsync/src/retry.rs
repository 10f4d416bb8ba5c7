//! Per-chunk retry accounting.
//!
//! One tracker per [`PushSync`](crate::PushSync) instance, shared by the
//! worker and by every forwarding handler. A single lock covers the map; the
//! set of in-flight addresses is small.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use swarmsync_core::Address;

/// Verdict of [`RetryTracker::begin_attempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Go ahead with the transfer.
    Proceed,
    /// The address already failed `max_retries` times; its entry is gone.
    Exceeded,
}

/// Verdict of [`RetryTracker::record_failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Failure recorded; the address has now failed this many times.
    Retry(u32),
    /// The count went past the maximum; the entry is gone.
    Exhausted,
}

/// Failed-attempt counters keyed by chunk address.
///
/// An address has an entry from the start of its first attempt until an
/// attempt closes it out, either by success or by exhausting the budget.
/// While a first attempt is in flight the entry reads zero.
#[derive(Debug)]
pub struct RetryTracker {
    max_retries: u32,
    attempts: Mutex<HashMap<Address, u32>>,
}

impl RetryTracker {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Address, u32>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The configured maximum.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Check whether a transfer for `address` may start, opening an entry
    /// for it if there is none yet.
    pub fn begin_attempt(&self, address: &Address) -> Attempt {
        let mut attempts = self.lock();
        match attempts.get(address) {
            Some(&count) if count >= self.max_retries => {
                attempts.remove(address);
                Attempt::Exceeded
            }
            _ => {
                attempts.entry(*address).or_insert(0);
                Attempt::Proceed
            }
        }
    }

    /// Forget `address`. No-op if it has no entry.
    pub fn record_success(&self, address: &Address) {
        self.lock().remove(address);
    }

    /// Count one failed transfer for `address`.
    pub fn record_failure(&self, address: &Address) -> Failure {
        let mut attempts = self.lock();
        let count = attempts.get(address).copied().unwrap_or(0) + 1;
        if count > self.max_retries {
            attempts.remove(address);
            Failure::Exhausted
        } else {
            attempts.insert(*address, count);
            Failure::Retry(count)
        }
    }

    /// Failures recorded for `address`, if it has an entry.
    pub fn attempts(&self, address: &Address) -> Option<u32> {
        self.lock().get(address).copied()
    }

    /// Number of addresses with an entry.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

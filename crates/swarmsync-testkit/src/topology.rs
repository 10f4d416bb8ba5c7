//! Routing stand-in with a scripted answer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use swarmsync_core::Address;
use swarmsync_topology::{ClosestPeerer, Route, TopologyError};

/// A [`ClosestPeerer`] that answers every query the same way.
#[derive(Debug)]
pub struct MockTopology {
    answer: Mutex<Result<Route, TopologyError>>,
    calls: AtomicUsize,
}

impl MockTopology {
    /// Always route to `peer`.
    pub fn closest(peer: Address) -> Self {
        Self::answering(Ok(Route::Peer(peer)))
    }

    /// Always report the local node as closest.
    pub fn want_self() -> Self {
        Self::answering(Ok(Route::WantSelf))
    }

    /// Always fail with `error`.
    pub fn failing(error: TopologyError) -> Self {
        Self::answering(Err(error))
    }

    fn answering(answer: Result<Route, TopologyError>) -> Self {
        Self {
            answer: Mutex::new(answer),
            calls: AtomicUsize::new(0),
        }
    }

    /// Change the answer for subsequent queries.
    pub fn set(&self, answer: Result<Route, TopologyError>) {
        *self.answer.lock().unwrap_or_else(PoisonError::into_inner) = answer;
    }

    /// Number of queries answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClosestPeerer for MockTopology {
    fn closest_peer(&self, _address: &Address) -> Result<Route, TopologyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_answers() {
        let peer = Address::from_bytes([0x60; 32]);
        let topology = MockTopology::closest(peer);
        assert_eq!(topology.closest_peer(&Address::ZERO), Ok(Route::Peer(peer)));

        topology.set(Ok(Route::WantSelf));
        assert_eq!(topology.closest_peer(&Address::ZERO), Ok(Route::WantSelf));

        topology.set(Err(TopologyError::NotFound));
        assert_eq!(
            topology.closest_peer(&Address::ZERO),
            Err(TopologyError::NotFound)
        );
        assert_eq!(topology.calls(), 3);
    }
}

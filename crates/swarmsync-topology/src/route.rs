//! The routing seam consumed by push-sync.

use std::sync::Arc;

use swarmsync_core::Address;

use crate::error::Result;

/// Outcome of a closest-peer query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Forward toward this peer.
    Peer(Address),
    /// The local node is itself the closest known node.
    WantSelf,
}

impl Route {
    /// The peer to forward to, if any.
    pub fn peer(&self) -> Option<&Address> {
        match self {
            Route::Peer(peer) => Some(peer),
            Route::WantSelf => None,
        }
    }

    /// Whether the local node is the terminal hop.
    pub fn is_self(&self) -> bool {
        matches!(self, Route::WantSelf)
    }
}

/// Answers "who is closest to this address?".
///
/// Implementations must be thread-safe; push-sync queries routing from the
/// worker and from every inbound stream handler concurrently.
pub trait ClosestPeerer: Send + Sync {
    /// The closest known node to `address`.
    fn closest_peer(&self, address: &Address) -> Result<Route>;
}

impl<T: ClosestPeerer + ?Sized> ClosestPeerer for Arc<T> {
    fn closest_peer(&self, address: &Address) -> Result<Route> {
        (**self).closest_peer(address)
    }
}

impl<T: ClosestPeerer + ?Sized> ClosestPeerer for &T {
    fn closest_peer(&self, address: &Address) -> Result<Route> {
        (**self).closest_peer(address)
    }
}

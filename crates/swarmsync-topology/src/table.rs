//! XOR-distance routing table.

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};

use swarmsync_core::Address;

use crate::error::{Result, TopologyError};
use crate::route::{ClosestPeerer, Route};

/// A flat table of connected peers around a base address.
///
/// `closest_peer` scans every connected peer and picks the one with the
/// smallest XOR distance to the target. The local node wins when its own
/// base address is strictly closer than that peer.
#[derive(Debug)]
pub struct ProximityTable {
    base: Address,
    peers: RwLock<BTreeSet<Address>>,
}

impl ProximityTable {
    /// Create an empty table for the node at `base`.
    pub fn new(base: Address) -> Self {
        Self {
            base,
            peers: RwLock::new(BTreeSet::new()),
        }
    }

    /// Create a table pre-populated with `peers`.
    pub fn with_peers(base: Address, peers: impl IntoIterator<Item = Address>) -> Self {
        let table = Self::new(base);
        for peer in peers {
            table.connect(peer);
        }
        table
    }

    /// The local node's overlay address.
    pub fn base(&self) -> &Address {
        &self.base
    }

    /// Add a peer. Returns false if it was already connected or is the base.
    pub fn connect(&self, peer: Address) -> bool {
        if peer == self.base {
            return false;
        }
        let added = self
            .peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer);
        if added {
            tracing::debug!(base = %self.base, peer = %peer, "peer connected");
        }
        added
    }

    /// Remove a peer. Returns false if it was not connected.
    pub fn disconnect(&self, peer: &Address) -> bool {
        let removed = self
            .peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(peer);
        if removed {
            tracing::debug!(base = %self.base, peer = %peer, "peer disconnected");
        }
        removed
    }

    /// Snapshot of the connected peers, in address order.
    pub fn peers(&self) -> Vec<Address> {
        self.peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    /// Number of connected peers.
    pub fn len(&self) -> usize {
        self.peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no peers are connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClosestPeerer for ProximityTable {
    fn closest_peer(&self, address: &Address) -> Result<Route> {
        let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);

        let closest = peers
            .iter()
            .min_by_key(|peer| address.distance(peer))
            .ok_or(TopologyError::NotFound)?;

        if address.closer(&self.base, closest) {
            Ok(Route::WantSelf)
        } else {
            Ok(Route::Peer(*closest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(first: u8) -> Address {
        let mut bytes = [0u8; 32];
        bytes[0] = first;
        Address::from_bytes(bytes)
    }

    #[test]
    fn test_empty_table_is_not_found() {
        let table = ProximityTable::new(addr(0x00));
        assert_eq!(table.closest_peer(&addr(0x70)), Err(TopologyError::NotFound));
    }

    #[test]
    fn test_picks_closest_peer() {
        let table = ProximityTable::with_peers(addr(0x00), [addr(0x60), addr(0x80), addr(0x10)]);
        assert_eq!(table.closest_peer(&addr(0x70)), Ok(Route::Peer(addr(0x60))));
        assert_eq!(table.closest_peer(&addr(0x90)), Ok(Route::Peer(addr(0x80))));
    }

    #[test]
    fn test_want_self_when_base_is_closest() {
        let table = ProximityTable::with_peers(addr(0x60), [addr(0x00), addr(0x80)]);
        assert_eq!(table.closest_peer(&addr(0x70)), Ok(Route::WantSelf));
    }

    #[test]
    fn test_connect_disconnect() {
        let table = ProximityTable::new(addr(0x00));
        assert!(table.connect(addr(0x60)));
        assert!(!table.connect(addr(0x60)));
        assert!(!table.connect(addr(0x00)));
        assert_eq!(table.peers(), vec![addr(0x60)]);

        assert!(table.disconnect(&addr(0x60)));
        assert!(!table.disconnect(&addr(0x60)));
        assert!(table.is_empty());
    }

    proptest! {
        #[test]
        fn prop_forwarding_chain_terminates(
            nodes in proptest::collection::btree_set(prop::array::uniform32(any::<u8>()), 1..24),
            target in prop::array::uniform32(any::<u8>()),
            start in any::<prop::sample::Index>(),
        ) {
            let nodes: Vec<Address> = nodes.into_iter().map(Address::from_bytes).collect();
            let target = Address::from_bytes(target);

            let tables: Vec<ProximityTable> = nodes
                .iter()
                .map(|base| ProximityTable::with_peers(*base, nodes.iter().copied()))
                .collect();

            let mut current = start.index(nodes.len());
            let mut hops = 0usize;

            loop {
                let table = &tables[current];
                match table.closest_peer(&target) {
                    Ok(Route::WantSelf) | Err(TopologyError::NotFound) => break,
                    Ok(Route::Peer(next)) => {
                        prop_assert!(target.closer(&next, table.base()));
                        hops += 1;
                        prop_assert!(hops <= nodes.len());
                        current = nodes.iter().position(|a| *a == next).unwrap();
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }
            }
        }
    }
}

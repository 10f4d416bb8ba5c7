//! # Swarmsync Topology
//!
//! Closest-peer routing for push-sync.
//!
//! ## Key Types
//!
//! - [`ClosestPeerer`] - the routing seam: given an address, who is closest?
//! - [`Route`] - either a peer to forward to, or [`Route::WantSelf`] when the
//!   local node is itself the closest known node
//! - [`ProximityTable`] - a flat XOR-distance table of connected peers
//!
//! ## Design Notes
//!
//! `WantSelf` is a value, never an error: it is the terminal condition of
//! every forwarding chain. [`TopologyError::NotFound`] means there is nobody
//! to route to at all.

pub mod error;
pub mod route;
pub mod table;

pub use error::{Result, TopologyError};
pub use route::{ClosestPeerer, Route};
pub use table::ProximityTable;

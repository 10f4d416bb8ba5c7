//! # Swarmsync Core
//!
//! Pure primitives shared by every swarmsync crate: overlay addresses,
//! chunks, and the XOR proximity metric used for routing.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Address`] - 32-byte overlay address, used both for chunks and for peers
//! - [`Chunk`] - Immutable `(address, data)` pair with a bounded payload
//! - [`Distance`] - XOR distance between two addresses, totally ordered
//!
//! Chunk addresses are computed outside this crate. Nothing here ever
//! recomputes or verifies them; the address a chunk is handed with is the
//! address it keeps.

pub mod address;
pub mod chunk;
pub mod error;
pub mod proximity;

pub use address::{Address, ADDRESS_LEN};
pub use chunk::{Chunk, CHUNK_SIZE, MAX_CHUNK_DATA_SIZE, SPAN_SIZE};
pub use error::{CoreError, Result};
pub use proximity::{proximity, Distance, MAX_PO};

//! Storage layer for tupledb
//!
//! This crate defines the storage adapter contract and two reference backends:
//! - TupleStorage: synchronous scan/commit/close contract
//! - AsyncTupleStorage + SyncAdapter: asynchronous contract (feature `async`)
//! - InMemoryTupleStorage: sorted vector under a RwLock
//! - EncodedTupleStorage: BTreeMap keyed by order-preserving tuple encodings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoded;
pub mod memory;
pub mod traits;

pub use encoded::EncodedTupleStorage;
pub use memory::InMemoryTupleStorage;
pub use traits::TupleStorage;

#[cfg(feature = "async")]
pub use traits::{AsyncTupleStorage, SyncAdapter};

//! tupledb - embeddable ordered tuple store
//!
//! tupledb stores `(tuple, value)` rows sorted by a type-aware tuple order and
//! adds, on top of any storage backend:
//! - optimistic transactions with read-your-writes and conflict detection
//! - subspaces (prefix namespaces) that share one engine
//! - subscriptions that receive exactly the committed writes in their range
//! - an order-preserving string encoding for byte-ordered backends
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tupledb::{transactional_read_write, Bounds, RetryConfig, TupleDatabase, TupleDatabaseClient, Value};
//!
//! let client = TupleDatabaseClient::new(Arc::new(TupleDatabase::in_memory()));
//! let users = client.subspace(vec!["users".into()]);
//!
//! transactional_read_write(&RetryConfig::default(), &users, |tx| {
//!     tx.set(vec![Value::from(1)], Value::from("ada"))
//! })?;
//!
//! let rows = users.scan(Bounds::new())?;
//! ```
//!
//! # Architecture
//!
//! | Crate | Contents |
//! |-------|----------|
//! | `tupledb-core` | values, comparator, codec, bounds, sorted primitives, errors |
//! | `tupledb-storage` | storage adapter traits and reference backends |
//! | `tupledb-concurrency` | the concurrency log |
//! | `tupledb-engine` | database, client, transactions, reactivity, retry |

pub use tupledb_concurrency::{ConcurrencyLog, LogItem, ReadWriteConflict};
pub use tupledb_core::*;
pub use tupledb_engine::*;
pub use tupledb_storage::{EncodedTupleStorage, InMemoryTupleStorage, TupleStorage};

#[cfg(feature = "async")]
pub use tupledb_storage::{AsyncTupleStorage, SyncAdapter};

/// Traits needed to call transaction methods through `dyn` views
pub mod prelude {
    pub use tupledb_engine::{TransactionOps, TransactionRead, TransactionWrite};
    pub use tupledb_storage::TupleStorage;
}

//! Tuple database engine
//!
//! This crate orchestrates all lower layers:
//! - TupleDatabase: storage + concurrency log + reactivity
//! - TupleDatabaseClient: subspace-aware handle, point lookups, transactions
//! - Transaction: buffered writes with read-your-writes, atomic commit
//! - ReactivityTracker: bounds-based change notification
//! - Transactional combinators: retry on read-write conflict
//! - Configuration: TOML-backed encoding and retry settings
//! - Async flavour (feature `async`)
//!
//! The engine is the only component that knows about:
//! - The commit protocol (conflict check, write recording, apply, emit)
//! - Transaction lifecycle and metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod coordinator;
pub mod database;
pub mod reactivity;
pub mod transaction;
pub mod transaction_ops;
pub mod transactional;

#[cfg(feature = "async")]
pub mod asynchronous;

pub use client::TupleDatabaseClient;
pub use coordinator::{TransactionCoordinator, TransactionMetrics};
pub use database::{EncodingConfig, RetryConfig, TupleDatabase, TupleDbConfig};
pub use reactivity::{
    callback, Callback, CallbackError, CallbackResult, ReactivityTracker, SubscriptionId,
    Unsubscribe,
};
pub use transaction::{Transaction, TransactionStatus, TransactionSubspace, WriteBuffer};
pub use transaction_ops::{TransactionOps, TransactionRead, TransactionWrite};
pub use transactional::{
    transactional_read, transactional_read_write, transactional_write, TxContext,
};

#[cfg(feature = "async")]
pub use asynchronous::{
    async_callback, transactional_read_async, transactional_read_write_async,
    transactional_write_async, AsyncCallback, AsyncTransaction, AsyncTransactionReader,
    AsyncTransactionSubspace, AsyncTransactionWriter, AsyncTupleDatabase,
    AsyncTupleDatabaseClient, AsyncTxContext, BoxFuture,
};

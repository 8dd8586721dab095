//! TupleDatabase: storage, conflict detection and reactivity in one place
//!
//! This module provides the engine that orchestrates:
//! - A storage backend behind the [`TupleStorage`] contract
//! - The [`ConcurrencyLog`] for optimistic conflict detection
//! - The [`ReactivityTracker`] for change notification
//! - Transaction metrics
//!
//! ## Commit protocol
//!
//! 1. Match the writes against current subscriptions
//! 2. Under the log lock: check the committing transaction for conflicts,
//!    apply the batch to storage, then record every touched tuple as a write
//! 3. After the lock is released: notify matched subscribers
//!
//! A conflicting commit never reaches storage, a batch the backend rejects
//! leaves no write records behind, and subscribers never observe a write
//! before the backend has applied it.

pub mod config;
mod transactions;

pub use config::{EncodingConfig, TupleDbConfig};
pub use transactions::RetryConfig;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use tupledb_concurrency::ConcurrencyLog;
use tupledb_core::{Error, KeyValuePair, NormalizedBounds, Result, TxId, WriteOps};
use tupledb_storage::{EncodedTupleStorage, InMemoryTupleStorage, TupleStorage};

use crate::coordinator::{TransactionCoordinator, TransactionMetrics};
use crate::reactivity::{Callback, ReactivityTracker, Unsubscribe};

// ============================================================================
// Database Struct
// ============================================================================

/// Embeddable ordered tuple store with transactions and subscriptions
///
/// Share it across threads behind an `Arc`; every method takes `&self`.
/// Most callers use it through [`TupleDatabaseClient`](crate::TupleDatabaseClient).
///
/// # Example
///
/// ```text
/// let db = Arc::new(TupleDatabase::in_memory());
/// db.commit(&WriteOps::new().with_set(vec!["a".into()], 1.into()), None)?;
/// let rows = db.scan(&Bounds::prefix(vec![]).normalize(), None)?;
/// ```
pub struct TupleDatabase {
    storage: Box<dyn TupleStorage>,
    log: Mutex<ConcurrencyLog>,
    reactivity: ReactivityTracker,
    coordinator: TransactionCoordinator,
    config: TupleDbConfig,
    open: AtomicBool,
}

impl TupleDatabase {
    /// Create a database over `storage` with the default configuration
    pub fn new(storage: impl TupleStorage + 'static) -> Self {
        Self::with_config(storage, TupleDbConfig::default())
    }

    /// Create a database over `storage` with `config`
    ///
    /// The encoding section is ignored here: `storage` already exists.
    pub fn with_config(storage: impl TupleStorage + 'static, config: TupleDbConfig) -> Self {
        debug!(target: "tupledb::storage", "Database opened");
        Self {
            storage: Box::new(storage),
            log: Mutex::new(ConcurrencyLog::new()),
            reactivity: ReactivityTracker::new(),
            coordinator: TransactionCoordinator::new(),
            config,
            open: AtomicBool::new(true),
        }
    }

    /// Create a database over a fresh [`InMemoryTupleStorage`]
    pub fn in_memory() -> Self {
        Self::new(InMemoryTupleStorage::new())
    }

    /// Create a database over a fresh [`EncodedTupleStorage`] using the
    /// encoding options from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding section is invalid.
    pub fn from_config(config: TupleDbConfig) -> Result<Self> {
        let storage = EncodedTupleStorage::with_options(config.encoding_options()?)?;
        Ok(Self::with_config(storage, config))
    }

    /// Rows within `bounds`, recording the read for `tx_id` first
    ///
    /// # Errors
    ///
    /// Returns `InvalidBounds` for an inverted range or a storage error.
    pub fn scan(&self, bounds: &NormalizedBounds, tx_id: Option<TxId>) -> Result<Vec<KeyValuePair>> {
        bounds.validate()?;
        if let Some(tx_id) = tx_id {
            self.log.lock().read(tx_id, bounds.clone());
        }
        self.storage.scan(bounds)
    }

    /// Apply `writes` atomically
    ///
    /// With a `tx_id`, the commit is rejected if another transaction wrote
    /// inside any range this one read; the transaction's reads are dropped
    /// either way. Without one, the batch is a blind write that never
    /// conflicts.
    ///
    /// # Errors
    ///
    /// Returns `ReadWriteConflict` if the transaction lost a race, or a
    /// storage error if the backend rejected the batch.
    pub fn commit(&self, writes: &WriteOps, tx_id: Option<TxId>) -> Result<()> {
        let emits = self.reactivity.compute_emits(writes);
        let writer = tx_id.unwrap_or_default();

        {
            let mut log = self.log.lock();
            if let Some(tx_id) = tx_id {
                if let Err(conflict) = log.commit(tx_id) {
                    self.coordinator.record_conflict();
                    warn!(
                        target: "tupledb::txn",
                        %tx_id,
                        writer = %conflict.writer_tx_id,
                        tuple = ?conflict.tuple,
                        "Transaction conflicted"
                    );
                    return Err(conflict.into());
                }
            }
            if let Err(e) = self.storage.commit(writes) {
                if tx_id.is_some() {
                    self.coordinator.record_cancel();
                }
                return Err(e);
            }
            for tuple in writes.touched() {
                log.write(writer, tuple.clone());
            }
        }

        if tx_id.is_some() {
            self.coordinator.record_commit();
        }
        if writes.is_empty() {
            debug!(target: "tupledb::txn", tx_id = %writer, "Committed without writes");
        } else {
            info!(
                target: "tupledb::txn",
                tx_id = %writer,
                sets = writes.set.len(),
                removes = writes.remove.len(),
                subscribers = emits.len(),
                "Committed"
            );
        }

        self.reactivity.emit(emits, writer);
        Ok(())
    }

    /// Discard `tx_id`'s recorded reads
    ///
    /// Never touches storage; unknown ids are a no-op.
    pub fn cancel(&self, tx_id: TxId) {
        self.log.lock().cancel(tx_id);
        self.coordinator.record_cancel();
        debug!(target: "tupledb::txn", %tx_id, "Transaction cancelled");
    }

    /// Call `callback` with the matching slice of every later commit that
    /// writes inside `bounds`
    ///
    /// # Errors
    ///
    /// Returns `InvalidBounds` for an inverted range.
    pub fn subscribe(
        &self,
        bounds: impl Into<NormalizedBounds>,
        callback: Callback,
    ) -> Result<Unsubscribe> {
        let bounds = bounds.into();
        bounds.validate()?;
        Ok(self.reactivity.subscribe(bounds, callback))
    }

    /// Close the storage backend
    ///
    /// Later scans and commits fail with a storage error.
    pub fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Err(Error::storage("database already closed"));
        }
        self.storage.close()?;
        info!(target: "tupledb::storage", "Database closed");
        Ok(())
    }

    /// Whether [`close`](Self::close) has not been called
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Start a new transaction id and count it in the metrics
    pub fn begin(&self) -> TxId {
        self.coordinator.start_transaction()
    }

    /// Count a caller-supplied transaction id as started
    pub fn begin_with_id(&self, tx_id: TxId) -> TxId {
        self.coordinator.record_start();
        debug!(target: "tupledb::txn", %tx_id, "Transaction started");
        tx_id
    }

    /// Snapshot of the transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    /// The configuration this database was created with
    pub fn config(&self) -> &TupleDbConfig {
        &self.config
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.reactivity.len()
    }

    /// Number of entries in the concurrency log
    pub fn log_len(&self) -> usize {
        self.log.lock().len()
    }
}

impl fmt::Debug for TupleDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleDatabase")
            .field("open", &self.is_open())
            .field("reactivity", &self.reactivity)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

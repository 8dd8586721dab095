//! Subspace-aware handle to a TupleDatabase
//!
//! A client carries a prefix. Every key it writes is prefixed and every key
//! it reads has the prefix stripped, so independent namespaces can share one
//! engine without collisions. The root client has an empty prefix.

use std::sync::Arc;

use tupledb_core::{prepend, Bounds, KeyValuePair, Result, Tuple, TxId, Value, WriteOps};

use crate::database::{RetryConfig, TupleDatabase};
use crate::reactivity::{self, Callback, Unsubscribe};
use crate::transaction::{strip_rows, Transaction};
use crate::transaction_ops::single;

/// Cheaply cloneable handle to a shared [`TupleDatabase`]
#[derive(Debug, Clone)]
pub struct TupleDatabaseClient {
    db: Arc<TupleDatabase>,
    prefix: Tuple,
}

impl TupleDatabaseClient {
    /// Root client over `db`
    pub fn new(db: Arc<TupleDatabase>) -> Self {
        Self {
            db,
            prefix: Vec::new(),
        }
    }

    /// The underlying database
    pub fn database(&self) -> &Arc<TupleDatabase> {
        &self.db
    }

    /// This client's absolute prefix
    pub fn prefix(&self) -> &[Value] {
        &self.prefix
    }

    /// Rows within `bounds`, outside any transaction
    pub fn scan(&self, bounds: Bounds) -> Result<Vec<KeyValuePair>> {
        let bounds = bounds.with_prefix(&self.prefix).normalize();
        let rows = self.db.scan(&bounds, None)?;
        Ok(strip_rows(&self.prefix, rows))
    }

    /// The value at `tuple`, if any
    ///
    /// # Errors
    ///
    /// Returns `MultipleResults` if the point scan matched more than one row.
    pub fn get(&self, tuple: Tuple) -> Result<Option<Value>> {
        let rows = self.scan(Bounds::point(tuple.clone()))?;
        single(tuple, rows)
    }

    /// Whether a row exists at `tuple`
    pub fn exists(&self, tuple: Tuple) -> Result<bool> {
        Ok(self.get(tuple)?.is_some())
    }

    /// Call `callback` for every later commit writing inside `bounds`
    ///
    /// The callback sees keys relative to this client's subspace.
    pub fn subscribe(&self, bounds: Bounds, callback: Callback) -> Result<Unsubscribe> {
        let bounds = bounds.with_prefix(&self.prefix).normalize();
        if self.prefix.is_empty() {
            return self.db.subscribe(bounds, callback);
        }
        let prefix = self.prefix.clone();
        let relative = reactivity::callback(move |writes: &WriteOps, tx_id: TxId| {
            callback(&writes.clone().strip_prefix(&prefix), tx_id)
        });
        self.db.subscribe(bounds, relative)
    }

    /// Apply `writes` directly, optionally as transaction `tx_id`
    pub fn commit(&self, writes: WriteOps, tx_id: Option<TxId>) -> Result<()> {
        self.db.commit(&writes.with_prefix(&self.prefix), tx_id)
    }

    /// Discard `tx_id`'s recorded reads
    pub fn cancel(&self, tx_id: TxId) {
        self.db.cancel(tx_id);
    }

    /// A client for the subspace `prefix` below this one
    pub fn subspace(&self, prefix: Tuple) -> Self {
        Self {
            db: Arc::clone(&self.db),
            prefix: prepend(&self.prefix, prefix),
        }
    }

    /// Start a root transaction
    pub fn transact(&self) -> Transaction {
        let tx_id = self.db.begin();
        Transaction::new(Arc::clone(&self.db), self.prefix.clone(), tx_id)
    }

    /// Start a root transaction with a caller-chosen id
    pub fn transact_with_id(&self, tx_id: TxId) -> Transaction {
        let tx_id = self.db.begin_with_id(tx_id);
        Transaction::new(Arc::clone(&self.db), self.prefix.clone(), tx_id)
    }

    /// Close the underlying database
    pub fn close(&self) -> Result<()> {
        self.db.close()
    }

    /// The retry policy from the database configuration
    pub fn retry_config(&self) -> RetryConfig {
        self.db.config().retry_config()
    }
}

impl From<Arc<TupleDatabase>> for TupleDatabaseClient {
    fn from(db: Arc<TupleDatabase>) -> Self {
        Self::new(db)
    }
}

impl From<TupleDatabase> for TupleDatabaseClient {
    fn from(db: TupleDatabase) -> Self {
        Self::new(Arc::new(db))
    }
}

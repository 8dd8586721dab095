//! Root transactions
//!
//! This module provides:
//! - [`Transaction`]: buffers writes, records reads, commits atomically
//! - [`WriteBuffer`]: lazily sorted sets and removes with read-your-writes merge
//! - [`TransactionSubspace`]: a prefixed, non-committing view of a transaction
//!
//! # Lifecycle
//!
//! A transaction starts Active. `commit` and `cancel` both end it, and so
//! does a failed commit. Any call on an ended transaction fails with
//! `TransactionClosed`. Dropping an active transaction cancels it.

pub mod buffer;
pub mod subspace;

pub use buffer::WriteBuffer;
pub use subspace::TransactionSubspace;

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tupledb_core::{
    prepend, strip_prefix, Bounds, Error, KeyValuePair, Result, Tuple, TxId, Value, WriteOps,
};

use crate::database::TupleDatabase;
use crate::transaction_ops::{single, TransactionOps, TransactionRead, TransactionWrite};

/// Lifecycle state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting reads and writes
    Active,
    /// Async commit in flight
    Committing,
    /// Commit succeeded
    Committed,
    /// Commit failed (conflict or storage error)
    Aborted,
    /// Cancelled by the caller or dropped
    Cancelled,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Active => "active",
            TransactionStatus::Committing => "committing",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Aborted => "aborted",
            TransactionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A root transaction over a [`TupleDatabase`]
///
/// Obtained from [`TupleDatabaseClient::transact`](crate::TupleDatabaseClient::transact).
/// Keys are relative to the client's subspace.
pub struct Transaction {
    db: Arc<TupleDatabase>,
    prefix: Tuple,
    tx_id: TxId,
    buffer: WriteBuffer,
    status: TransactionStatus,
}

impl Transaction {
    pub(crate) fn new(db: Arc<TupleDatabase>, prefix: Tuple, tx_id: TxId) -> Self {
        Self {
            db,
            prefix,
            tx_id,
            buffer: WriteBuffer::new(),
            status: TransactionStatus::Active,
        }
    }

    /// This transaction's id
    pub fn id(&self) -> TxId {
        self.tx_id
    }

    /// Current lifecycle state
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Whether the transaction still accepts operations
    pub fn is_open(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Number of distinct keys written so far
    pub fn pending_operations(&mut self) -> usize {
        self.buffer.len()
    }

    /// The batch `commit` would apply, relative to the client's subspace
    pub fn write_ops(&mut self) -> WriteOps {
        self.buffer.write_ops().strip_prefix(&self.prefix)
    }

    /// Rows within `bounds`, with this transaction's writes applied
    ///
    /// The read is recorded for conflict detection.
    pub fn scan(&mut self, bounds: Bounds) -> Result<Vec<KeyValuePair>> {
        self.ensure_open()?;
        let bounds = bounds.with_prefix(&self.prefix).normalize();
        bounds.validate()?;

        let db = &self.db;
        let tx_id = self.tx_id;
        let rows = self.buffer.merge(&bounds, |b| db.scan(b, Some(tx_id)))?;
        Ok(strip_rows(&self.prefix, rows))
    }

    /// The value at `tuple`, if any
    pub fn get(&mut self, tuple: Tuple) -> Result<Option<Value>> {
        let rows = self.scan(Bounds::point(tuple.clone()))?;
        single(tuple, rows)
    }

    /// Whether a row exists at `tuple`
    pub fn exists(&mut self, tuple: Tuple) -> Result<bool> {
        Ok(self.get(tuple)?.is_some())
    }

    /// Buffer an insert or overwrite
    pub fn set(&mut self, tuple: Tuple, value: Value) -> Result<()> {
        self.ensure_open()?;
        self.buffer.set(prepend(&self.prefix, tuple), value);
        Ok(())
    }

    /// Buffer a delete
    pub fn remove(&mut self, tuple: Tuple) -> Result<()> {
        self.ensure_open()?;
        self.buffer.remove(prepend(&self.prefix, tuple));
        Ok(())
    }

    /// Apply every buffered write atomically
    ///
    /// The transaction is closed afterwards whether or not the commit
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns `ReadWriteConflict` if another transaction wrote inside a
    /// range this one read.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let writes = self.buffer.write_ops();
        match self.db.commit(&writes, Some(self.tx_id)) {
            Ok(()) => {
                self.status = TransactionStatus::Committed;
                Ok(())
            }
            Err(e) => {
                self.status = TransactionStatus::Aborted;
                Err(e)
            }
        }
    }

    /// Discard buffered writes and recorded reads
    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.status = TransactionStatus::Cancelled;
        self.db.cancel(self.tx_id);
        Ok(())
    }

    /// A view of this transaction under `prefix`
    pub fn subspace(&mut self, prefix: Tuple) -> TransactionSubspace<'_> {
        TransactionSubspace::new(self, prefix)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::TransactionClosed {
                tx_id: self.tx_id,
                state: self.status.to_string(),
            })
        }
    }
}

impl TransactionRead for Transaction {
    fn scan(&mut self, bounds: Bounds) -> Result<Vec<KeyValuePair>> {
        Transaction::scan(self, bounds)
    }
}

impl TransactionWrite for Transaction {
    fn set(&mut self, tuple: Tuple, value: Value) -> Result<()> {
        Transaction::set(self, tuple, value)
    }

    fn remove(&mut self, tuple: Tuple) -> Result<()> {
        Transaction::remove(self, tuple)
    }
}

impl TransactionOps for Transaction {
    fn as_read(&mut self) -> &mut dyn TransactionRead {
        self
    }

    fn as_write(&mut self) -> &mut dyn TransactionWrite {
        self
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.is_open() {
            debug!(target: "tupledb::txn", tx_id = %self.tx_id, "Dropping open transaction");
            self.status = TransactionStatus::Cancelled;
            self.db.cancel(self.tx_id);
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("tx_id", &self.tx_id)
            .field("prefix", &self.prefix)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Strip `prefix` from every row key, dropping rows outside it
pub(crate) fn strip_rows(prefix: &[Value], rows: Vec<KeyValuePair>) -> Vec<KeyValuePair> {
    if prefix.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter_map(|kv| strip_prefix(prefix, &kv.key).map(|key| KeyValuePair::new(key, kv.value)))
        .collect()
}

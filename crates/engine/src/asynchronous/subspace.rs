//! Nested views of an async transaction
//!
//! A subspace borrows its root [`AsyncTransaction`] and forwards every read
//! and write under an extra prefix. Like the sync
//! [`TransactionSubspace`](crate::TransactionSubspace) it cannot commit or
//! cancel. The reader and writer views restrict a subspace to one half of
//! its operations for the capability-restricted combinators.

use std::fmt;

use tupledb_core::{prepend, Bounds, KeyValuePair, Result, Tuple, TxId, Value};
use tupledb_storage::AsyncTupleStorage;

use super::AsyncTransaction;
use crate::transaction::strip_rows;
use crate::transaction_ops::single;

/// An async transaction restricted to tuples under `prefix`
pub struct AsyncTransactionSubspace<'a, S: AsyncTupleStorage> {
    tx: &'a mut AsyncTransaction<S>,
    prefix: Tuple,
}

impl<'a, S: AsyncTupleStorage> AsyncTransactionSubspace<'a, S> {
    pub(crate) fn new(tx: &'a mut AsyncTransaction<S>, prefix: Tuple) -> Self {
        Self { tx, prefix }
    }

    /// The root transaction's id
    pub fn id(&self) -> TxId {
        self.tx.id()
    }

    /// The prefix relative to the root transaction
    pub fn prefix(&self) -> &[Value] {
        &self.prefix
    }

    /// A deeper view under `prefix`
    pub fn subspace(&mut self, prefix: Tuple) -> AsyncTransactionSubspace<'_, S> {
        AsyncTransactionSubspace::new(&mut *self.tx, prepend(&self.prefix, prefix))
    }

    /// Rows within `bounds`, with the transaction's writes applied
    pub async fn scan(&mut self, bounds: Bounds) -> Result<Vec<KeyValuePair>> {
        let rows = self.tx.scan(bounds.with_prefix(&self.prefix)).await?;
        Ok(strip_rows(&self.prefix, rows))
    }

    /// The value at `tuple`, if any
    pub async fn get(&mut self, tuple: Tuple) -> Result<Option<Value>> {
        let rows = self.scan(Bounds::point(tuple.clone())).await?;
        single(tuple, rows)
    }

    /// Whether a row exists at `tuple`
    pub async fn exists(&mut self, tuple: Tuple) -> Result<bool> {
        Ok(self.get(tuple).await?.is_some())
    }

    /// Buffer an insert or overwrite
    pub fn set(&mut self, tuple: Tuple, value: Value) -> Result<()> {
        self.tx.set(prepend(&self.prefix, tuple), value)
    }

    /// Buffer a delete
    pub fn remove(&mut self, tuple: Tuple) -> Result<()> {
        self.tx.remove(prepend(&self.prefix, tuple))
    }
}

impl<S: AsyncTupleStorage> fmt::Debug for AsyncTransactionSubspace<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTransactionSubspace")
            .field("tx_id", &self.tx.id())
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Read-only view handed to [`transactional_read_async`](super::transactional_read_async)
pub struct AsyncTransactionReader<'a, S: AsyncTupleStorage> {
    inner: AsyncTransactionSubspace<'a, S>,
}

impl<'a, S: AsyncTupleStorage> AsyncTransactionReader<'a, S> {
    pub(crate) fn new(tx: &'a mut AsyncTransaction<S>) -> Self {
        Self {
            inner: AsyncTransactionSubspace::new(tx, Vec::new()),
        }
    }

    /// The root transaction's id
    pub fn id(&self) -> TxId {
        self.inner.id()
    }

    /// A read-only view under `prefix`
    pub fn subspace(&mut self, prefix: Tuple) -> AsyncTransactionReader<'_, S> {
        AsyncTransactionReader {
            inner: self.inner.subspace(prefix),
        }
    }

    /// Rows within `bounds`
    pub async fn scan(&mut self, bounds: Bounds) -> Result<Vec<KeyValuePair>> {
        self.inner.scan(bounds).await
    }

    /// The value at `tuple`, if any
    pub async fn get(&mut self, tuple: Tuple) -> Result<Option<Value>> {
        self.inner.get(tuple).await
    }

    /// Whether a row exists at `tuple`
    pub async fn exists(&mut self, tuple: Tuple) -> Result<bool> {
        self.inner.exists(tuple).await
    }
}

impl<S: AsyncTupleStorage> fmt::Debug for AsyncTransactionReader<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AsyncTransactionReader").field(&self.inner).finish()
    }
}

/// Write-only view handed to [`transactional_write_async`](super::transactional_write_async)
pub struct AsyncTransactionWriter<'a, S: AsyncTupleStorage> {
    inner: AsyncTransactionSubspace<'a, S>,
}

impl<'a, S: AsyncTupleStorage> AsyncTransactionWriter<'a, S> {
    pub(crate) fn new(tx: &'a mut AsyncTransaction<S>) -> Self {
        Self {
            inner: AsyncTransactionSubspace::new(tx, Vec::new()),
        }
    }

    /// The root transaction's id
    pub fn id(&self) -> TxId {
        self.inner.id()
    }

    /// A write-only view under `prefix`
    pub fn subspace(&mut self, prefix: Tuple) -> AsyncTransactionWriter<'_, S> {
        AsyncTransactionWriter {
            inner: self.inner.subspace(prefix),
        }
    }

    /// Buffer an insert or overwrite
    pub fn set(&mut self, tuple: Tuple, value: Value) -> Result<()> {
        self.inner.set(tuple, value)
    }

    /// Buffer a delete
    pub fn remove(&mut self, tuple: Tuple) -> Result<()> {
        self.inner.remove(tuple)
    }
}

impl<S: AsyncTupleStorage> fmt::Debug for AsyncTransactionWriter<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AsyncTransactionWriter").field(&self.inner).finish()
    }
}

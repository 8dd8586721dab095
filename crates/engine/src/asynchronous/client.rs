//! Async client and root transaction

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tupledb_core::{prepend, Bounds, Error, KeyValuePair, Result, Tuple, TxId, Value, WriteOps};
use tupledb_storage::AsyncTupleStorage;

use super::{async_callback, AsyncCallback, AsyncTransactionSubspace, AsyncTupleDatabase};
use crate::database::RetryConfig;
use crate::reactivity::Unsubscribe;
use crate::transaction::{strip_rows, TransactionStatus, WriteBuffer};
use crate::transaction_ops::single;

/// Subspace-aware handle to a shared [`AsyncTupleDatabase`]
pub struct AsyncTupleDatabaseClient<S> {
    db: Arc<AsyncTupleDatabase<S>>,
    prefix: Tuple,
}

impl<S> Clone for AsyncTupleDatabaseClient<S> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            prefix: self.prefix.clone(),
        }
    }
}

impl<S: AsyncTupleStorage> AsyncTupleDatabaseClient<S> {
    /// Root client over `db`
    pub fn new(db: Arc<AsyncTupleDatabase<S>>) -> Self {
        Self {
            db,
            prefix: Vec::new(),
        }
    }

    /// The underlying database
    pub fn database(&self) -> &Arc<AsyncTupleDatabase<S>> {
        &self.db
    }

    /// This client's absolute prefix
    pub fn prefix(&self) -> &[Value] {
        &self.prefix
    }

    /// Rows within `bounds`, outside any transaction
    pub async fn scan(&self, bounds: Bounds) -> Result<Vec<KeyValuePair>> {
        let bounds = bounds.with_prefix(&self.prefix).normalize();
        let rows = self.db.scan(&bounds, None).await?;
        Ok(strip_rows(&self.prefix, rows))
    }

    /// The value at `tuple`, if any
    pub async fn get(&self, tuple: Tuple) -> Result<Option<Value>> {
        let rows = self.scan(Bounds::point(tuple.clone())).await?;
        single(tuple, rows)
    }

    /// Whether a row exists at `tuple`
    pub async fn exists(&self, tuple: Tuple) -> Result<bool> {
        Ok(self.get(tuple).await?.is_some())
    }

    /// Await `callback` for every later commit writing inside `bounds`
    ///
    /// The callback sees keys relative to this client's subspace.
    pub fn subscribe(&self, bounds: Bounds, callback: AsyncCallback) -> Result<Unsubscribe> {
        let bounds = bounds.with_prefix(&self.prefix).normalize();
        if self.prefix.is_empty() {
            return self.db.subscribe(bounds, callback);
        }
        let prefix = self.prefix.clone();
        let relative = async_callback(move |writes: WriteOps, tx_id: TxId| {
            callback(writes.strip_prefix(&prefix), tx_id)
        });
        self.db.subscribe(bounds, relative)
    }

    /// Apply `writes` directly, optionally as transaction `tx_id`
    pub async fn commit(&self, writes: WriteOps, tx_id: Option<TxId>) -> Result<()> {
        self.db.commit(&writes.with_prefix(&self.prefix), tx_id).await
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
    pub fn transact(&self) -> AsyncTransaction<S> {
        let tx_id = self.db.begin();
        AsyncTransaction::new(Arc::clone(&self.db), self.prefix.clone(), tx_id)
    }

    /// Start a root transaction with a caller-chosen id
    pub fn transact_with_id(&self, tx_id: TxId) -> AsyncTransaction<S> {
        let tx_id = self.db.begin_with_id(tx_id);
        AsyncTransaction::new(Arc::clone(&self.db), self.prefix.clone(), tx_id)
    }

    /// Close the underlying database
    pub async fn close(&self) -> Result<()> {
        self.db.close().await
    }

    /// The retry policy from the database configuration
    pub fn retry_config(&self) -> RetryConfig {
        self.db.config().retry_config()
    }
}

impl<S> fmt::Debug for AsyncTupleDatabaseClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTupleDatabaseClient")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// A root transaction over an [`AsyncTupleDatabase`]
///
/// Same lifecycle as [`Transaction`](crate::Transaction): commit, cancel or
/// a failed commit end it, and dropping it while active cancels it. A commit
/// whose future is dropped mid-flight leaves it `Committing`, cancelled.
pub struct AsyncTransaction<S: AsyncTupleStorage> {
    db: Arc<AsyncTupleDatabase<S>>,
    prefix: Tuple,
    tx_id: TxId,
    buffer: WriteBuffer,
    status: TransactionStatus,
}

impl<S: AsyncTupleStorage> AsyncTransaction<S> {
    fn new(db: Arc<AsyncTupleDatabase<S>>, prefix: Tuple, tx_id: TxId) -> Self {
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
    pub async fn scan(&mut self, bounds: Bounds) -> Result<Vec<KeyValuePair>> {
        self.ensure_open()?;
        let bounds = bounds.with_prefix(&self.prefix).normalize();
        bounds.validate()?;

        // The merge is synchronous, so fetch a widened storage range first
        let widened = self.buffer.fetch_bounds(&bounds);
        let rows = self.db.scan(&widened, Some(self.tx_id)).await?;
        let merged = self.buffer.merge(&bounds, |_| Ok(rows))?;
        Ok(strip_rows(&self.prefix, merged))
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

    /// A non-committing view of this transaction under `prefix`
    pub fn subspace(&mut self, prefix: Tuple) -> AsyncTransactionSubspace<'_, S> {
        AsyncTransactionSubspace::new(self, prefix)
    }

    /// Apply every buffered write atomically
    ///
    /// The transaction is closed afterwards whether or not the commit
    /// succeeded.
    pub async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let writes = self.buffer.write_ops();
        // The database cancels the transaction if this future is dropped
        self.status = TransactionStatus::Committing;
        match self.db.commit(&writes, Some(self.tx_id)).await {
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

impl<S: AsyncTupleStorage> Drop for AsyncTransaction<S> {
    fn drop(&mut self) {
        if self.is_open() {
            debug!(target: "tupledb::txn", tx_id = %self.tx_id, "Dropping open transaction");
            self.status = TransactionStatus::Cancelled;
            self.db.cancel(self.tx_id);
        }
    }
}

impl<S: AsyncTupleStorage> fmt::Debug for AsyncTransaction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTransaction")
            .field("tx_id", &self.tx_id)
            .field("prefix", &self.prefix)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

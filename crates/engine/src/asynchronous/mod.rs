//! Async engine flavour (feature `async`)
//!
//! Same semantics as [`TupleDatabase`](crate::TupleDatabase) over an
//! [`AsyncTupleStorage`] backend. The pure pieces (bounds, codec, write
//! buffer merge, concurrency log, emit matching) are shared with the sync
//! engine; only the storage calls and subscriber notification await.
//!
//! ## Ordering
//!
//! Commits are serialized by an async commit lock held across the storage
//! call. Before that lock is released the commit joins the emit queue, so
//! subscribers are notified in commit order and two commits never run one
//! subscriber's callback concurrently. `commit` returns only after every
//! matched callback has completed.
//!
//! A commit future dropped before its outcome is recorded cancels the
//! transaction, releasing its reads from the concurrency log.
//!
//! Callbacks run on the tokio runtime. They may scan the database but must
//! not await a commit on it: the emit queue is held while they run.

mod client;
mod subspace;
mod transactional;

pub use client::{AsyncTransaction, AsyncTupleDatabaseClient};
pub use subspace::{AsyncTransactionReader, AsyncTransactionSubspace, AsyncTransactionWriter};
pub use transactional::{
    transactional_read_async, transactional_read_write_async, transactional_write_async,
    AsyncTxContext,
};

use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use tupledb_concurrency::ConcurrencyLog;
use tupledb_core::{Error, KeyValuePair, NormalizedBounds, Result, TxId, WriteOps};
use tupledb_storage::AsyncTupleStorage;

use crate::coordinator::{TransactionCoordinator, TransactionMetrics};
use crate::database::TupleDbConfig;
use crate::reactivity::{panic_message, CallbackResult, Emit, ReactivityTracker, Unsubscribe};

/// Boxed, sendable future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Asynchronous subscriber callback
pub type AsyncCallback = Arc<dyn Fn(WriteOps, TxId) -> BoxFuture<'static, CallbackResult> + Send + Sync>;

/// Wrap an async closure as an [`AsyncCallback`]
pub fn async_callback<F, Fut>(f: F) -> AsyncCallback
where
    F: Fn(WriteOps, TxId) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallbackResult> + Send + 'static,
{
    Arc::new(move |writes: WriteOps, tx_id: TxId| -> BoxFuture<'static, CallbackResult> {
        Box::pin(f(writes, tx_id))
    })
}

/// Async tuple store with transactions and subscriptions
pub struct AsyncTupleDatabase<S> {
    storage: S,
    log: Mutex<ConcurrencyLog>,
    commit_lock: tokio::sync::Mutex<()>,
    emit_queue: tokio::sync::Mutex<()>,
    reactivity: ReactivityTracker<AsyncCallback>,
    coordinator: TransactionCoordinator,
    config: TupleDbConfig,
    open: AtomicBool,
}

impl<S: AsyncTupleStorage> AsyncTupleDatabase<S> {
    /// Create a database over `storage` with the default configuration
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, TupleDbConfig::default())
    }

    /// Create a database over `storage` with `config`
    pub fn with_config(storage: S, config: TupleDbConfig) -> Self {
        debug!(target: "tupledb::storage", "Async database opened");
        Self {
            storage,
            log: Mutex::new(ConcurrencyLog::new()),
            commit_lock: tokio::sync::Mutex::new(()),
            emit_queue: tokio::sync::Mutex::new(()),
            reactivity: ReactivityTracker::new(),
            coordinator: TransactionCoordinator::new(),
            config,
            open: AtomicBool::new(true),
        }
    }

    /// Rows within `bounds`, recording the read for `tx_id` first
    pub async fn scan(
        &self,
        bounds: &NormalizedBounds,
        tx_id: Option<TxId>,
    ) -> Result<Vec<KeyValuePair>> {
        bounds.validate()?;
        if let Some(tx_id) = tx_id {
            self.log.lock().read(tx_id, bounds.clone());
        }
        self.storage.scan(bounds).await
    }

    /// Apply `writes` atomically, then await every matched subscriber
    ///
    /// # Errors
    ///
    /// Returns `ReadWriteConflict` if the transaction lost a race, or a
    /// storage error if the backend rejected the batch.
    pub async fn commit(&self, writes: &WriteOps, tx_id: Option<TxId>) -> Result<()> {
        let emits = self.reactivity.compute_emits(writes);
        let writer = tx_id.unwrap_or_default();
        let pending = PendingCommit { db: self, tx_id };

        let commit_guard = self.commit_lock.lock().await;
        if let Some(tx_id) = tx_id {
            let checked = self.log.lock().commit(tx_id);
            if let Err(conflict) = checked {
                pending.settle();
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

        // Writes are recorded only once the backend has accepted the batch
        if let Err(e) = self.storage.commit(writes).await {
            pending.settle();
            if tx_id.is_some() {
                self.coordinator.record_cancel();
            }
            return Err(e);
        }
        {
            let mut log = self.log.lock();
            for tuple in writes.touched() {
                log.write(writer, tuple.clone());
            }
        }
        pending.settle();
        if tx_id.is_some() {
            self.coordinator.record_commit();
        }

        let emit_guard = self.emit_queue.lock().await;
        drop(commit_guard);

        if !writes.is_empty() {
            info!(
                target: "tupledb::txn",
                tx_id = %writer,
                sets = writes.set.len(),
                removes = writes.remove.len(),
                subscribers = emits.len(),
                "Committed"
            );
        }

        emit_all(emits, writer).await;
        drop(emit_guard);
        Ok(())
    }

    /// Discard `tx_id`'s recorded reads
    pub fn cancel(&self, tx_id: TxId) {
        self.log.lock().cancel(tx_id);
        self.coordinator.record_cancel();
        debug!(target: "tupledb::txn", %tx_id, "Transaction cancelled");
    }

    /// Await `callback` for every later commit writing inside `bounds`
    pub fn subscribe(
        &self,
        bounds: impl Into<NormalizedBounds>,
        callback: AsyncCallback,
    ) -> Result<Unsubscribe> {
        let bounds = bounds.into();
        bounds.validate()?;
        Ok(self.reactivity.subscribe(bounds, callback))
    }

    /// Close the storage backend
    pub async fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Err(Error::storage("database already closed"));
        }
        self.storage.close().await?;
        info!(target: "tupledb::storage", "Async database closed");
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

    /// The storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Number of entries in the concurrency log
    pub fn log_len(&self) -> usize {
        self.log.lock().len()
    }
}

impl<S> fmt::Debug for AsyncTupleDatabase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTupleDatabase")
            .field("open", &self.open.load(Ordering::SeqCst))
            .field("reactivity", &self.reactivity)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Cancels a transaction whose commit future is dropped before the outcome
/// is recorded
struct PendingCommit<'a, S: AsyncTupleStorage> {
    db: &'a AsyncTupleDatabase<S>,
    tx_id: Option<TxId>,
}

impl<S: AsyncTupleStorage> PendingCommit<'_, S> {
    fn settle(mut self) {
        self.tx_id = None;
    }
}

impl<S: AsyncTupleStorage> Drop for PendingCommit<'_, S> {
    fn drop(&mut self) {
        if let Some(tx_id) = self.tx_id.take() {
            debug!(target: "tupledb::txn", %tx_id, "Commit abandoned before completion");
            self.db.cancel(tx_id);
        }
    }
}

/// Run every matched callback concurrently and wait for all of them
///
/// Errors and panics are logged, never propagated.
async fn emit_all(emits: Vec<Emit<AsyncCallback>>, tx_id: TxId) {
    let mut tasks = JoinSet::new();
    for emit in emits {
        let subscription = emit.subscription;
        let callback = emit.callback;
        let writes = emit.writes;
        match catch_unwind(AssertUnwindSafe(|| callback(writes, tx_id))) {
            Ok(future) => {
                tasks.spawn(async move { (subscription, future.await) });
            }
            Err(panic) => error!(
                target: "tupledb::reactivity",
                %subscription,
                %tx_id,
                panic = panic_message(panic.as_ref()),
                "Subscriber callback panicked"
            ),
        }
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((subscription, Err(e))) => error!(
                target: "tupledb::reactivity",
                %subscription,
                %tx_id,
                error = %e,
                "Subscriber callback failed"
            ),
            Err(e) if e.is_panic() => {
                let panic = e.into_panic();
                error!(
                    target: "tupledb::reactivity",
                    %tx_id,
                    panic = panic_message(panic.as_ref()),
                    "Subscriber callback panicked"
                );
            }
            Err(e) => error!(
                target: "tupledb::reactivity",
                %tx_id,
                error = %e,
                "Subscriber callback task failed"
            ),
        }
    }
}

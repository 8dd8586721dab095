//! Transaction coordinator for lifecycle accounting
//!
//! The TransactionCoordinator hands out transaction ids and keeps metrics:
//! - Active transaction tracking
//! - Transaction metrics (started, committed, conflicted, cancelled)
//! - Commit rate calculation

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;
use tupledb_core::TxId;

/// Transaction coordinator for the database
///
/// # Memory Ordering
///
/// The counters are purely observational and do not synchronize any other
/// memory, so they use Relaxed ordering.
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_conflicted: AtomicU64,
    total_cancelled: AtomicU64,
}

impl TransactionCoordinator {
    /// Create a coordinator with zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a new transaction and count it as started
    pub fn start_transaction(&self) -> TxId {
        let tx_id = TxId::new();
        self.record_start();
        debug!(target: "tupledb::txn", %tx_id, "Transaction started");
        tx_id
    }

    /// Record transaction start
    ///
    /// Used when the caller supplies its own transaction id.
    pub fn record_start(&self) {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful commit
    pub fn record_commit(&self) {
        self.finish();
        self.total_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a commit rejected by a read-write conflict
    pub fn record_conflict(&self) {
        self.finish();
        self.total_conflicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cancelled transaction
    pub fn record_cancel(&self) {
        self.finish();
        self.total_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        // Saturating decrement: cancel may be called for ids the coordinator never saw
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
    }

    /// Snapshot of the current metrics
    pub fn metrics(&self) -> TransactionMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: started,
            total_committed: committed,
            total_conflicted: self.total_conflicted.load(Ordering::Relaxed),
            total_cancelled: self.total_cancelled.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }
}

/// Point-in-time transaction metrics
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionMetrics {
    /// Number of currently open transactions
    pub active_count: u64,
    /// Total number of transactions started
    pub total_started: u64,
    /// Total number of transactions committed
    pub total_committed: u64,
    /// Total number of commits rejected by a conflict
    pub total_conflicted: u64,
    /// Total number of transactions cancelled
    pub total_cancelled: u64,
    /// Commit success rate (committed / started)
    pub commit_rate: f64,
}

impl TransactionMetrics {
    /// Total transactions that finished (committed + conflicted + cancelled)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_conflicted + self.total_cancelled
    }

    /// Conflict rate (conflicted / started)
    pub fn conflict_rate(&self) -> f64 {
        if self.total_started > 0 {
            self.total_conflicted as f64 / self.total_started as f64
        } else {
            0.0
        }
    }
}

//! Concurrency log for optimistic conflict detection
//!
//! The log is an append-only sequence of reads and writes. A transaction's
//! reads are appended as it scans; committed writes are appended only when
//! some recorded read covers them. At commit time a transaction conflicts if
//! any write record in the log falls inside one of its read bounds, wherever
//! that record sits relative to the read.
//!
//! ## Rules
//!
//! - First committer wins: the later committer sees the earlier's write
//! - Blind writes (no covering read) are never recorded and never conflict
//! - Reads are dropped when their transaction commits or cancels; writes are
//!   dropped once no remaining read covers them

use tracing::trace;

use tupledb_core::{NormalizedBounds, Tuple, TxId};

use crate::conflict::ReadWriteConflict;

/// One entry in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogItem {
    /// A transaction scanned `bounds`
    Read {
        /// Reading transaction
        tx_id: TxId,
        /// Scanned range
        bounds: NormalizedBounds,
    },
    /// A committed write to `tuple`
    Write {
        /// Writing transaction
        tx_id: TxId,
        /// Written tuple
        tuple: Tuple,
    },
}

/// Append-only read/write log used to detect read-write conflicts
#[derive(Debug, Default)]
pub struct ConcurrencyLog {
    log: Vec<LogItem>,
}

impl ConcurrencyLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `tx_id` scanned `bounds`
    pub fn read(&mut self, tx_id: TxId, bounds: NormalizedBounds) {
        self.log.push(LogItem::Read { tx_id, bounds });
    }

    /// Record a committed write to `tuple` by `tx_id`
    ///
    /// Nothing is recorded unless an existing read covers `tuple`.
    pub fn write(&mut self, tx_id: TxId, tuple: Tuple) {
        let covered = self.log.iter().any(|item| match item {
            LogItem::Read { bounds, .. } => bounds.contains(&tuple),
            LogItem::Write { .. } => false,
        });
        if covered {
            self.log.push(LogItem::Write { tx_id, tuple });
        }
    }

    /// Check `tx_id` for conflicts, then drop its reads and orphaned writes
    ///
    /// Cleanup runs whether or not a conflict is found.
    ///
    /// # Errors
    ///
    /// Returns the first write record that falls inside one of `tx_id`'s
    /// reads.
    pub fn commit(&mut self, tx_id: TxId) -> Result<(), ReadWriteConflict> {
        let result = self.check_for_conflicts(tx_id);
        self.cleanup(tx_id);
        result
    }

    /// Drop `tx_id`'s reads and orphaned writes without checking for conflicts
    pub fn cancel(&mut self, tx_id: TxId) {
        self.cleanup(tx_id);
    }

    /// Entries currently in the log
    pub fn items(&self) -> &[LogItem] {
        &self.log
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    fn check_for_conflicts(&self, tx_id: TxId) -> Result<(), ReadWriteConflict> {
        let reads: Vec<&NormalizedBounds> = self
            .log
            .iter()
            .filter_map(|item| match item {
                LogItem::Read { tx_id: reader, bounds } if *reader == tx_id => Some(bounds),
                _ => None,
            })
            .collect();
        if reads.is_empty() {
            return Ok(());
        }

        for item in &self.log {
            if let LogItem::Write { tx_id: writer, tuple } = item {
                if let Some(bounds) = reads.iter().find(|b| b.contains(tuple)) {
                    return Err(ReadWriteConflict {
                        writer_tx_id: *writer,
                        tuple: tuple.clone(),
                        read_bounds: (*bounds).clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn cleanup(&mut self, tx_id: TxId) {
        let before = self.log.len();
        self.log
            .retain(|item| !matches!(item, LogItem::Read { tx_id: reader, .. } if *reader == tx_id));

        // A write survives while any remaining read covers it
        let live_reads: Vec<NormalizedBounds> = self
            .log
            .iter()
            .filter_map(|item| match item {
                LogItem::Read { bounds, .. } => Some(bounds.clone()),
                LogItem::Write { .. } => None,
            })
            .collect();
        self.log.retain(|item| match item {
            LogItem::Read { .. } => true,
            LogItem::Write { tuple, .. } => live_reads.iter().any(|b| b.contains(tuple)),
        });

        trace!(
            target: "tupledb::txn",
            %tx_id,
            removed = before - self.log.len(),
            remaining = self.log.len(),
            "Concurrency log cleaned up"
        );
    }
}

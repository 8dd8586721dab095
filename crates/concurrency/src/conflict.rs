//! Read-write conflict reported by the concurrency log
//!
//! A conflict means another transaction committed a write inside a range
//! the committing transaction read. It is a retry signal, not a fatal error.

use tupledb_core::{Error, NormalizedBounds, Tuple, TxId};

/// A committed write fell inside one of the committing transaction's reads
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("read-write conflict: transaction {writer_tx_id} wrote {tuple:?} inside read bounds {read_bounds:?}")]
pub struct ReadWriteConflict {
    /// Transaction whose write caused the conflict
    pub writer_tx_id: TxId,
    /// The written tuple
    pub tuple: Tuple,
    /// The read bounds the write fell into
    pub read_bounds: NormalizedBounds,
}

impl From<ReadWriteConflict> for Error {
    fn from(conflict: ReadWriteConflict) -> Self {
        Error::ReadWriteConflict {
            writer_tx_id: conflict.writer_tx_id,
            tuple: conflict.tuple,
            read_bounds: conflict.read_bounds,
        }
    }
}

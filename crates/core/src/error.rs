//! Error types for tupledb
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Error Classes
//!
//! | Class | Variants | Retried? |
//! |-------|----------|----------|
//! | Conflict | `ReadWriteConflict` | Yes, by the transactional combinators |
//! | Usage | `TransactionClosed`, `MultipleResults`, `InvalidBounds`, `Encoding` | Never |
//! | Storage | `Storage` | Never, propagated unmodified |

use crate::bounds::NormalizedBounds;
use crate::types::{Tuple, TxId};
use thiserror::Error;

/// Result type alias for tupledb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the tuple engine
#[derive(Debug, Error)]
pub enum Error {
    /// A value could not be encoded (e.g. a string contains a disallowed character)
    #[error("Encoding error: {message}")]
    Encoding {
        /// What went wrong
        message: String,
    },

    /// An encoded string could not be decoded back into a value or tuple
    #[error("Decoding error: {message}")]
    Decoding {
        /// What went wrong
        message: String,
    },

    /// The lower bound of a range sorts after its upper bound
    #[error("Invalid bounds: lower bound {lower} is greater than upper bound {upper}")]
    InvalidBounds {
        /// Rendered lower endpoint
        lower: String,
        /// Rendered upper endpoint
        upper: String,
    },

    /// Another transaction committed a write inside a range this transaction read
    ///
    /// This is the only recoverable error: the whole transaction may be retried.
    #[error("Read-write conflict: transaction {writer_tx_id} wrote {tuple:?} inside read bounds {read_bounds:?}")]
    ReadWriteConflict {
        /// Transaction whose committed write caused the conflict
        writer_tx_id: TxId,
        /// The written tuple
        tuple: Tuple,
        /// The read bounds the write fell into
        read_bounds: NormalizedBounds,
    },

    /// A single-point lookup matched more than one row (storage invariant violation)
    #[error("Expected at most one result for {tuple:?}, found {count}")]
    MultipleResults {
        /// The looked-up tuple
        tuple: Tuple,
        /// Number of rows returned
        count: usize,
    },

    /// The transaction was already committed or cancelled
    #[error("Transaction {tx_id} is closed ({state})")]
    TransactionClosed {
        /// Transaction identifier
        tx_id: TxId,
        /// Terminal state the transaction is in
        state: String,
    },

    /// Storage adapter error
    #[error("Storage error: {message}")]
    Storage {
        /// What went wrong
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Internal invariant violation (bug)
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong
        message: String,
    },
}

impl Error {
    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding {
            message: message.into(),
        }
    }

    /// Create a decoding error
    pub fn decoding(message: impl Into<String>) -> Self {
        Error::Decoding {
            message: message.into(),
        }
    }

    /// Create a storage error without an underlying cause
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a read-write conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ReadWriteConflict { .. })
    }

    /// Check if this error is retryable.
    ///
    /// Only conflicts are retryable: a fresh attempt reads fresh data.
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// Check if this error is a caller mistake (never retried).
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::TransactionClosed { .. }
                | Error::MultipleResults { .. }
                | Error::InvalidBounds { .. }
                | Error::Encoding { .. }
        )
    }
}

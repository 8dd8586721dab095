//! Transaction traits - capability-restricted views of a transaction
//!
//! Code that only reads takes `&mut dyn TransactionRead`, code that only
//! writes takes `&mut dyn TransactionWrite`, and composable units of work
//! take `&mut dyn TransactionOps`. A root [`Transaction`](crate::Transaction)
//! and a [`TransactionSubspace`](crate::TransactionSubspace) both implement
//! all three, so the same function runs at the top level or nested inside a
//! larger transaction.
//!
//! ## Usage
//!
//! ```text
//! fn rename(tx: &mut dyn TransactionOps, id: i64, name: &str) -> Result<()> {
//!     let old = tx.get(vec!["users".into(), id.into()])?;
//!     tx.set(vec!["users".into(), id.into()], name.into())?;
//!     Ok(())
//! }
//! ```

use tupledb_core::{Bounds, Error, KeyValuePair, Result, Tuple, Value};

use crate::transaction::TransactionSubspace;

/// Read operations inside a transaction
///
/// Reads see the transaction's own buffered writes.
pub trait TransactionRead {
    /// Rows within `bounds`, relative to the transaction's subspace
    fn scan(&mut self, bounds: Bounds) -> Result<Vec<KeyValuePair>>;

    /// The value at `tuple`, if any
    ///
    /// # Errors
    ///
    /// Returns `MultipleResults` if the point scan matched more than one row.
    fn get(&mut self, tuple: Tuple) -> Result<Option<Value>> {
        let rows = self.scan(Bounds::point(tuple.clone()))?;
        single(tuple, rows)
    }

    /// Whether a row exists at `tuple`
    fn exists(&mut self, tuple: Tuple) -> Result<bool> {
        Ok(self.get(tuple)?.is_some())
    }
}

/// Write operations inside a transaction
///
/// Writes are buffered until the root transaction commits.
pub trait TransactionWrite {
    /// Insert or overwrite the value at `tuple`
    fn set(&mut self, tuple: Tuple, value: Value) -> Result<()>;

    /// Delete the row at `tuple`
    fn remove(&mut self, tuple: Tuple) -> Result<()>;
}

/// Full read-write access to a transaction
pub trait TransactionOps: TransactionRead + TransactionWrite {
    /// This transaction as a read-only view
    fn as_read(&mut self) -> &mut dyn TransactionRead;

    /// This transaction as a write-only view
    fn as_write(&mut self) -> &mut dyn TransactionWrite;
}

impl<'a> dyn TransactionOps + 'a {
    /// A view of this transaction under `prefix`
    pub fn subspace(&mut self, prefix: Tuple) -> TransactionSubspace<'_> {
        TransactionSubspace::new(self, prefix)
    }
}

/// Reduce a point scan to at most one value
pub(crate) fn single(tuple: Tuple, mut rows: Vec<KeyValuePair>) -> Result<Option<Value>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop().map(|kv| kv.value)),
        count => Err(Error::MultipleResults { tuple, count }),
    }
}

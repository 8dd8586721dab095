//! Nested transaction views
//!
//! A subspace borrows its parent transaction and forwards every read and
//! write under an extra prefix. It cannot commit or cancel: only the root
//! transaction ends the unit of work, so a composed function can never
//! partially commit a larger operation.

use tupledb_core::{prepend, Bounds, KeyValuePair, Result, Tuple, Value};

use crate::transaction::strip_rows;
use crate::transaction_ops::{TransactionOps, TransactionRead, TransactionWrite};

/// A transaction restricted to tuples under `prefix`
pub struct TransactionSubspace<'a> {
    parent: &'a mut (dyn TransactionOps + 'a),
    prefix: Tuple,
}

impl<'a> TransactionSubspace<'a> {
    /// Forward to `parent` under `prefix`
    pub fn new(parent: &'a mut (dyn TransactionOps + 'a), prefix: Tuple) -> Self {
        Self { parent, prefix }
    }

    /// The prefix relative to the parent
    pub fn prefix(&self) -> &[Value] {
        &self.prefix
    }

    /// A deeper view under `prefix`
    pub fn subspace(&mut self, prefix: Tuple) -> TransactionSubspace<'_> {
        TransactionSubspace::new(self, prefix)
    }
}

impl TransactionRead for TransactionSubspace<'_> {
    fn scan(&mut self, bounds: Bounds) -> Result<Vec<KeyValuePair>> {
        let rows = self.parent.scan(bounds.with_prefix(&self.prefix))?;
        Ok(strip_rows(&self.prefix, rows))
    }
}

impl TransactionWrite for TransactionSubspace<'_> {
    fn set(&mut self, tuple: Tuple, value: Value) -> Result<()> {
        self.parent.set(prepend(&self.prefix, tuple), value)
    }

    fn remove(&mut self, tuple: Tuple) -> Result<()> {
        self.parent.remove(prepend(&self.prefix, tuple))
    }
}

impl TransactionOps for TransactionSubspace<'_> {
    fn as_read(&mut self) -> &mut dyn TransactionRead {
        self
    }

    fn as_write(&mut self) -> &mut dyn TransactionWrite {
        self
    }
}

impl std::fmt::Debug for TransactionSubspace<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSubspace")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

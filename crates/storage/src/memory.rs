//! InMemoryTupleStorage: sorted-vector backend
//!
//! Rows live in a `Vec<KeyValuePair>` kept in key order by the sorted-array
//! primitives, behind a `parking_lot::RwLock`. Scans take the read lock and
//! binary-search the range; commits take the write lock for the whole batch,
//! so a batch is never observed half-applied.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use tupledb_core::sorted::kv;
use tupledb_core::{Error, KeyValuePair, NormalizedBounds, Result, WriteOps};

use crate::traits::TupleStorage;

/// In-memory backend over a sorted vector
#[derive(Debug, Default)]
pub struct InMemoryTupleStorage {
    data: RwLock<Vec<KeyValuePair>>,
    closed: AtomicBool,
}

impl InMemoryTupleStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with `rows`
    pub fn with_rows(rows: impl IntoIterator<Item = KeyValuePair>) -> Self {
        let mut data = Vec::new();
        for row in rows {
            kv::set(&mut data, row.key, row.value);
        }
        Self {
            data: RwLock::new(data),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::storage("in-memory storage is closed"));
        }
        Ok(())
    }
}

impl TupleStorage for InMemoryTupleStorage {
    fn scan(&self, bounds: &NormalizedBounds) -> Result<Vec<KeyValuePair>> {
        self.ensure_open()?;
        let data = self.data.read();
        kv::scan(&data, bounds)
    }

    fn commit(&self, writes: &WriteOps) -> Result<()> {
        self.ensure_open()?;
        let mut data = self.data.write();
        for row in &writes.set {
            kv::set(&mut data, row.key.clone(), row.value.clone());
        }
        for key in &writes.remove {
            kv::remove(&mut data, key);
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(target: "tupledb::storage", backend = "memory", rows = self.len(), "Storage closed");
        }
        Ok(())
    }
}

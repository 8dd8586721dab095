//! Buffered writes of an open transaction
//!
//! Writes are appended to a pending queue and only folded into the two
//! sorted arrays (sets and removes) when a read or the commit needs a
//! consistent view. Folding applies the queue in order, so the last write to
//! a key wins and a key is never in both arrays.

use std::cmp::Ordering;

use tupledb_core::sorted::{self, kv};
use tupledb_core::{compare_tuple, KeyValuePair, NormalizedBounds, Result, Tuple, Value, WriteOps};

/// Pending sets and removes of one transaction
#[derive(Debug, Clone, Default)]
pub struct WriteBuffer {
    sets: Vec<KeyValuePair>,
    removes: Vec<Tuple>,
    pending: Vec<(Tuple, Option<Value>)>,
}

impl WriteBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer an insert or overwrite
    pub fn set(&mut self, key: Tuple, value: Value) {
        self.pending.push((key, Some(value)));
    }

    /// Buffer a delete
    pub fn remove(&mut self, key: Tuple) {
        self.pending.push((key, None));
    }

    /// Whether writes arrived since the arrays were last sorted
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of distinct keys written
    pub fn len(&mut self) -> usize {
        self.settle();
        self.sets.len() + self.removes.len()
    }

    /// Check if nothing was written
    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// The settled batch, sets and removes each in key order
    pub fn write_ops(&mut self) -> WriteOps {
        self.settle();
        WriteOps {
            set: self.sets.clone(),
            remove: self.removes.clone(),
        }
    }

    /// The buffered state of `key`: `Some(Some(v))` set, `Some(None)` removed
    pub fn lookup(&mut self, key: &[Value]) -> Option<Option<&Value>> {
        self.settle();
        if let Some(value) = kv::get(&self.sets, key) {
            return Some(Some(value));
        }
        sorted::exists(&self.removes, key).then_some(None)
    }

    /// The storage range to fetch for `bounds`
    ///
    /// The limit is widened by the number of buffered removes in range so a
    /// limited scan still yields enough rows after removed keys are dropped.
    pub fn fetch_bounds(&mut self, bounds: &NormalizedBounds) -> NormalizedBounds {
        self.settle();
        let removed = self.removes.iter().filter(|t| bounds.contains(t)).count();
        bounds.with_limit(bounds.limit.map(|l| l + removed))
    }

    /// Overlay the buffered writes on storage rows within `bounds`
    ///
    /// `fetch` is called once, with [`fetch_bounds`](Self::fetch_bounds).
    pub fn merge<F>(&mut self, bounds: &NormalizedBounds, fetch: F) -> Result<Vec<KeyValuePair>>
    where
        F: FnOnce(&NormalizedBounds) -> Result<Vec<KeyValuePair>>,
    {
        self.settle();
        if self.sets.is_empty() && self.removes.is_empty() {
            return fetch(bounds);
        }

        let forward = NormalizedBounds {
            limit: None,
            reverse: false,
            ..bounds.clone()
        };
        let sets = kv::scan(&self.sets, &forward)?;

        let mut rows = fetch(&self.fetch_bounds(bounds))?;
        if bounds.reverse {
            rows.reverse();
        }

        let mut merged = Vec::with_capacity(rows.len() + sets.len());
        let mut sets = sets.into_iter().peekable();
        for row in rows {
            if sorted::exists(&self.removes, &row.key) {
                continue;
            }
            while let Some(set) = sets.next_if(|s| compare_tuple(&s.key, &row.key) == Ordering::Less) {
                merged.push(set);
            }
            match sets.peek() {
                Some(set) if compare_tuple(&set.key, &row.key) == Ordering::Equal => {}
                _ => merged.push(row),
            }
        }
        merged.extend(sets);

        if bounds.reverse {
            merged.reverse();
        }
        if let Some(limit) = bounds.limit {
            merged.truncate(limit);
        }
        Ok(merged)
    }

    fn settle(&mut self) {
        for (key, op) in self.pending.drain(..) {
            match op {
                Some(value) => {
                    sorted::remove(&mut self.removes, &key);
                    kv::set(&mut self.sets, key, value);
                }
                None => {
                    kv::remove(&mut self.sets, &key);
                    sorted::set(&mut self.removes, key);
                }
            }
        }
    }
}

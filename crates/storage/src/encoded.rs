//! EncodedTupleStorage: byte-ordered backend
//!
//! Keys are stored as their order-preserving string encoding in a
//! `BTreeMap<String, Value>`. Range scans run directly over the encoded
//! endpoints, so this backend relies on the codec ordering law the same way
//! a key-value store with only byte-wise ordering would.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use tupledb_core::{
    decode_tuple, encode_endpoint, encode_tuple, EncodingOptions, Endpoint, Error, KeyValuePair,
    NormalizedBounds, Result, Value, WriteOps,
};

use crate::traits::TupleStorage;

/// In-memory backend keyed by encoded tuples
#[derive(Debug)]
pub struct EncodedTupleStorage {
    data: RwLock<BTreeMap<String, Value>>,
    options: EncodingOptions,
    closed: AtomicBool,
}

impl Default for EncodedTupleStorage {
    fn default() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            options: EncodingOptions::default(),
            closed: AtomicBool::new(false),
        }
    }
}

impl EncodedTupleStorage {
    /// Create an empty store with the default encoding
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with custom encoding options
    ///
    /// # Errors
    ///
    /// Returns an `Encoding` error if the options are unusable.
    pub fn with_options(options: EncodingOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            ..Self::default()
        })
    }

    /// Encoding options in use
    pub fn options(&self) -> &EncodingOptions {
        &self.options
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Encoded keys in storage order
    pub fn encoded_keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::storage("encoded storage is closed"));
        }
        Ok(())
    }

    fn bound(&self, endpoint: Option<&Endpoint>) -> Result<Bound<String>> {
        Ok(match endpoint {
            None => Bound::Unbounded,
            Some(end) => {
                let encoded = encode_endpoint(end, &self.options)?;
                if end.inclusive {
                    Bound::Included(encoded)
                } else {
                    Bound::Excluded(encoded)
                }
            }
        })
    }
}

// BTreeMap::range panics on inverted or doubly-excluded equal bounds
fn range_is_empty(lower: &Bound<String>, upper: &Bound<String>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo) | Bound::Excluded(lo), Bound::Included(hi) | Bound::Excluded(hi)) => {
            lo >= hi
        }
        _ => false,
    }
}

impl TupleStorage for EncodedTupleStorage {
    fn scan(&self, bounds: &NormalizedBounds) -> Result<Vec<KeyValuePair>> {
        self.ensure_open()?;
        bounds.validate()?;

        let lower = self.bound(bounds.lower.as_ref())?;
        let upper = self.bound(bounds.upper.as_ref())?;
        if range_is_empty(&lower, &upper) {
            return Ok(Vec::new());
        }

        let data = self.data.read();
        let range = data.range((lower, upper));
        let limit = bounds.limit.unwrap_or(usize::MAX);
        let rows: Vec<(&String, &Value)> = if bounds.reverse {
            range.rev().take(limit).collect()
        } else {
            range.take(limit).collect()
        };

        rows.into_iter()
            .map(|(key, value)| {
                Ok(KeyValuePair::new(
                    decode_tuple(key, &self.options)?,
                    value.clone(),
                ))
            })
            .collect()
    }

    fn commit(&self, writes: &WriteOps) -> Result<()> {
        self.ensure_open()?;
        // A key that fails to encode leaves storage untouched
        let sets = writes
            .set
            .iter()
            .map(|row| Ok((encode_tuple(&row.key, &self.options)?, row.value.clone())))
            .collect::<Result<Vec<_>>>()?;
        let removes = writes
            .remove
            .iter()
            .map(|key| encode_tuple(key, &self.options))
            .collect::<Result<Vec<_>>>()?;

        let mut data = self.data.write();
        for (key, value) in sets {
            data.insert(key, value);
        }
        for key in removes {
            data.remove(&key);
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(target: "tupledb::storage", backend = "encoded", rows = self.len(), "Storage closed");
        }
        Ok(())
    }
}

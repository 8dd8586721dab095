//! Core types for tupledb
//!
//! This module defines the foundational types:
//! - Tuple: composite sort key (ordered sequence of values)
//! - TxId: opaque transaction identifier
//! - KeyValuePair: a stored row
//! - WriteOps: the unit of atomic mutation

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::value::Value;

/// Ordered sequence of values used as a composite sort key
pub type Tuple = Vec<Value>;

/// Unique identifier for a transaction
///
/// A TxId is a wrapper around a UUID v4. It correlates a transaction's
/// reads and writes in the concurrency log with its commit or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(Uuid);

impl TxId {
    /// Create a new random TxId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a TxId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parse a TxId from a string representation
    ///
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the raw bytes of this TxId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored row: tuple key plus value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    /// Sort key
    pub key: Tuple,
    /// Payload
    pub value: Value,
}

impl KeyValuePair {
    /// Create a new pair
    pub fn new(key: Tuple, value: Value) -> Self {
        Self { key, value }
    }
}

/// A batch of mutations applied atomically
///
/// `set` entries insert or overwrite, `remove` entries delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOps {
    /// Rows to insert or overwrite
    pub set: Vec<KeyValuePair>,
    /// Keys to delete
    pub remove: Vec<Tuple>,
}

impl WriteOps {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a set operation (builder style)
    pub fn with_set(mut self, key: Tuple, value: Value) -> Self {
        self.set.push(KeyValuePair::new(key, value));
        self
    }

    /// Add a remove operation (builder style)
    pub fn with_remove(mut self, key: Tuple) -> Self {
        self.remove.push(key);
        self
    }

    /// True when the batch mutates nothing
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Number of mutated keys
    pub fn len(&self) -> usize {
        self.set.len() + self.remove.len()
    }

    /// Every tuple touched by this batch, sets first
    pub fn touched(&self) -> impl Iterator<Item = &Tuple> {
        self.set.iter().map(|kv| &kv.key).chain(self.remove.iter())
    }

    /// Prepend `prefix` to every key
    pub fn with_prefix(self, prefix: &[Value]) -> Self {
        if prefix.is_empty() {
            return self;
        }
        WriteOps {
            set: self
                .set
                .into_iter()
                .map(|kv| KeyValuePair::new(prepend(prefix, kv.key), kv.value))
                .collect(),
            remove: self
                .remove
                .into_iter()
                .map(|key| prepend(prefix, key))
                .collect(),
        }
    }

    /// Strip `prefix` from every key
    ///
    /// Keys that do not start with `prefix` are dropped.
    pub fn strip_prefix(self, prefix: &[Value]) -> Self {
        if prefix.is_empty() {
            return self;
        }
        WriteOps {
            set: self
                .set
                .into_iter()
                .filter_map(|kv| strip_prefix(prefix, &kv.key).map(|key| KeyValuePair::new(key, kv.value)))
                .collect(),
            remove: self
                .remove
                .iter()
                .filter_map(|key| strip_prefix(prefix, key))
                .collect(),
        }
    }
}

/// `prefix ++ tuple`
pub fn prepend(prefix: &[Value], tuple: Tuple) -> Tuple {
    if prefix.is_empty() {
        return tuple;
    }
    let mut out = Vec::with_capacity(prefix.len() + tuple.len());
    out.extend_from_slice(prefix);
    out.extend(tuple);
    out
}

/// The remainder of `tuple` after `prefix`, or None if it does not start with `prefix`
pub fn strip_prefix(prefix: &[Value], tuple: &[Value]) -> Option<Tuple> {
    tuple.strip_prefix(prefix).map(<[Value]>::to_vec)
}

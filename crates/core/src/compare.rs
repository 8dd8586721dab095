//! Structural ordering of raw values and tuples
//!
//! This is the ground truth the codec's byte ordering must agree with:
//! for every pair of values, comparing their encodings gives the same
//! sign as [`compare_value`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::value::{canonical_number, Value};

/// Compare two values
///
/// Values of different kinds compare by [`TypeRank`](crate::value::TypeRank).
/// Within a kind, numbers compare numerically, strings lexicographically by
/// code point, arrays as tuples and objects field by field in key order.
pub fn compare_value(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_number(*x, *y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_tuple(x, y),
        (Value::Object(x), Value::Object(y)) => compare_object(x, y),
        _ => a.rank().cmp(&b.rank()),
    }
}

/// Compare two tuples component-wise
///
/// When every shared component is equal the shorter tuple sorts first.
pub fn compare_tuple(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match compare_value(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

fn compare_number(a: f64, b: f64) -> Ordering {
    canonical_number(a).total_cmp(&canonical_number(b))
}

// Fields are already key-sorted in the map; each field compares as a
// `[key, value]` pair so this agrees with the codec's object layout.
fn compare_object(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> Ordering {
    for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
        match ka.cmp(kb).then_with(|| compare_value(va, vb)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

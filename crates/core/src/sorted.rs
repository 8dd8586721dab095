//! Sorted-array primitives
//!
//! Ordered-list operations over a `Vec` kept in comparator order. Lookups are
//! O(log n) binary searches; inserts and removals are O(n) splices.
//!
//! The tuple functions at the top level sort by [`compare_tuple`]; the
//! [`kv`] submodule sorts `KeyValuePair`s by key only.

use std::cmp::Ordering;

use crate::bounds::NormalizedBounds;
use crate::compare::compare_tuple;
use crate::error::Result;
use crate::types::Tuple;
use crate::value::Value;

/// Outcome of a binary search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    /// The item is at this index
    Found(usize),
    /// The item is absent; inserting at this index keeps the list sorted
    Closest(usize),
}

impl SearchResult {
    /// The index if found
    pub fn found(self) -> Option<usize> {
        match self {
            SearchResult::Found(i) => Some(i),
            SearchResult::Closest(_) => None,
        }
    }
}

/// Binary search with a comparator
///
/// `cmp(element)` returns the ordering of `element` relative to the target.
pub fn binary_search_by<T, F>(list: &[T], mut cmp: F) -> SearchResult
where
    F: FnMut(&T) -> Ordering,
{
    let mut low = 0;
    let mut high = list.len();
    while low < high {
        let mid = low + (high - low) / 2;
        match cmp(&list[mid]) {
            Ordering::Equal => return SearchResult::Found(mid),
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
        }
    }
    SearchResult::Closest(low)
}

/// Binary search for a tuple
pub fn binary_search(list: &[Tuple], tuple: &[Value]) -> SearchResult {
    binary_search_by(list, |item| compare_tuple(item, tuple))
}

/// Insert `tuple`, replacing an equal one
pub fn set(list: &mut Vec<Tuple>, tuple: Tuple) {
    match binary_search(list, &tuple) {
        SearchResult::Found(i) => list[i] = tuple,
        SearchResult::Closest(i) => list.insert(i, tuple),
    }
}

/// The stored tuple equal to `tuple`
pub fn get<'a>(list: &'a [Tuple], tuple: &[Value]) -> Option<&'a Tuple> {
    binary_search(list, tuple).found().map(|i| &list[i])
}

/// Whether `tuple` is stored
pub fn exists(list: &[Tuple], tuple: &[Value]) -> bool {
    binary_search(list, tuple).found().is_some()
}

/// Remove `tuple`, returning it if it was stored
pub fn remove(list: &mut Vec<Tuple>, tuple: &[Value]) -> Option<Tuple> {
    binary_search(list, tuple).found().map(|i| list.remove(i))
}

/// Tuples within `bounds`, honoring `limit` and `reverse`
pub fn scan(list: &[Tuple], bounds: &NormalizedBounds) -> Result<Vec<Tuple>> {
    Ok(scan_by(list, bounds, |t| t.as_slice())?
        .into_iter()
        .cloned()
        .collect())
}

/// Elements whose key is within `bounds`, honoring `limit` and `reverse`
///
/// With `reverse` and `limit` together, the result is the last `limit`
/// elements of the range, in descending order.
pub fn scan_by<'a, T, K>(list: &'a [T], bounds: &NormalizedBounds, key: K) -> Result<Vec<&'a T>>
where
    K: Fn(&T) -> &[Value],
{
    bounds.validate()?;

    let start = list.partition_point(|item| !bounds.above_lower(key(item)));
    let end = list.partition_point(|item| bounds.below_upper(key(item)));
    let range = if start < end { &list[start..end] } else { &[][..] };

    let limit = bounds.limit.unwrap_or(usize::MAX);
    let result = if bounds.reverse {
        range.iter().rev().take(limit).collect()
    } else {
        range.iter().take(limit).collect()
    };
    Ok(result)
}

/// Sorted `KeyValuePair` lists ordered by key
pub mod kv {
    use super::*;
    use crate::types::KeyValuePair;

    /// Binary search for a key
    pub fn binary_search(list: &[KeyValuePair], key: &[Value]) -> SearchResult {
        binary_search_by(list, |item| compare_tuple(&item.key, key))
    }

    /// Insert or overwrite the value at `key`
    pub fn set(list: &mut Vec<KeyValuePair>, key: Tuple, value: Value) {
        match binary_search(list, &key) {
            SearchResult::Found(i) => list[i].value = value,
            SearchResult::Closest(i) => list.insert(i, KeyValuePair::new(key, value)),
        }
    }

    /// The value stored at `key`
    pub fn get<'a>(list: &'a [KeyValuePair], key: &[Value]) -> Option<&'a Value> {
        binary_search(list, key).found().map(|i| &list[i].value)
    }

    /// Whether `key` is stored
    pub fn exists(list: &[KeyValuePair], key: &[Value]) -> bool {
        binary_search(list, key).found().is_some()
    }

    /// Remove `key`, returning its value if it was stored
    pub fn remove(list: &mut Vec<KeyValuePair>, key: &[Value]) -> Option<Value> {
        binary_search(list, key)
            .found()
            .map(|i| list.remove(i).value)
    }

    /// Pairs whose key is within `bounds`
    pub fn scan(list: &[KeyValuePair], bounds: &NormalizedBounds) -> Result<Vec<KeyValuePair>> {
        Ok(scan_by(list, bounds, |kv| kv.key.as_slice())?
            .into_iter()
            .cloned()
            .collect())
    }
}

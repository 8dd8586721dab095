//! Read-Your-Writes Tests
//!
//! Transaction scans merge buffered writes over storage rows and honor
//! bounds, limit and reverse exactly as a storage scan would.

use crate::common::*;
use tupledb::prelude::*;
use tupledb::Error;

fn seeded() -> TupleDatabaseClient {
    client_with(&[
        (&["a"], Value::from(1)),
        (&["b"], Value::from(2)),
        (&["c"], Value::from(3)),
        (&["d"], Value::from(4)),
    ])
}

#[test]
fn buffered_set_overrides_storage_value() {
    let client = seeded();
    let mut tx = client.transact();
    tx.set(tuple(&["b"]), Value::from(20)).unwrap();

    let rows = tx.scan(Bounds::new()).unwrap();
    assert_eq!(keys(&rows), vec![tuple(&["a"]), tuple(&["b"]), tuple(&["c"]), tuple(&["d"])]);
    assert_eq!(rows[1].value, Value::from(20));
    assert_eq!(client.get(tuple(&["b"])).unwrap(), Some(Value::from(2)));
}

#[test]
fn buffered_remove_hides_storage_row() {
    let client = seeded();
    let mut tx = client.transact();
    tx.remove(tuple(&["a"])).unwrap();
    tx.set(tuple(&["bb"]), Value::from(5)).unwrap();

    let rows = tx.scan(Bounds::new()).unwrap();
    assert_eq!(
        keys(&rows),
        vec![tuple(&["b"]), tuple(&["bb"]), tuple(&["c"]), tuple(&["d"])]
    );
}

#[test]
fn limit_counts_rows_after_removes() {
    let client = seeded();
    let mut tx = client.transact();
    tx.remove(tuple(&["a"])).unwrap();
    tx.remove(tuple(&["b"])).unwrap();

    let rows = tx.scan(Bounds::new().limit(2)).unwrap();
    assert_eq!(keys(&rows), vec![tuple(&["c"]), tuple(&["d"])]);
}

#[test]
fn reverse_limit_merges_tail() {
    let client = seeded();
    let mut tx = client.transact();
    tx.set(tuple(&["e"]), Value::from(5)).unwrap();
    tx.remove(tuple(&["d"])).unwrap();

    let rows = tx.scan(Bounds::new().reverse().limit(2)).unwrap();
    assert_eq!(keys(&rows), vec![tuple(&["e"]), tuple(&["c"])]);
}

#[test]
fn set_then_remove_then_set_keeps_last() {
    let client = seeded();
    let mut tx = client.transact();
    tx.set(tuple(&["x"]), Value::from(1)).unwrap();
    tx.remove(tuple(&["x"])).unwrap();
    assert_eq!(tx.get(tuple(&["x"])).unwrap(), None);
    tx.set(tuple(&["x"]), Value::from(2)).unwrap();
    assert_eq!(tx.get(tuple(&["x"])).unwrap(), Some(Value::from(2)));

    let ops = tx.write_ops();
    assert_eq!(ops.set.len(), 1);
    assert!(ops.remove.is_empty());
    assert_eq!(tx.pending_operations(), 1);
}

#[test]
fn remove_of_missing_key_commits_cleanly() {
    let client = seeded();
    let mut tx = client.transact();
    tx.remove(tuple(&["nope"])).unwrap();
    tx.commit().unwrap();
    assert_eq!(client.scan(Bounds::new()).unwrap().len(), 4);
}

#[test]
fn get_ignores_descendants() {
    let client = seeded();
    let mut tx = client.transact();
    tx.set(tuple(&["a", "child"]), Value::from(10)).unwrap();

    assert_eq!(tx.get(tuple(&["a"])).unwrap(), Some(Value::from(1)));
    assert_eq!(tx.scan(Bounds::prefix(tuple(&["a"]))).unwrap().len(), 2);
}

#[test]
fn inverted_bounds_are_rejected_in_transactions() {
    let client = seeded();
    let mut tx = client.transact();
    let err = tx
        .scan(Bounds::new().gt(tuple(&["d"])).lt(tuple(&["a"])))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidBounds { .. }));
    assert!(tx.is_open());
}

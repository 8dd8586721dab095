//! Transaction Lifecycle Tests

use crate::common::*;
use tupledb::prelude::*;
use tupledb::{Error, TransactionStatus};

#[test]
fn commit_closes_transaction() {
    let client = client();
    let mut tx = client.transact();
    tx.set(tuple(&["a"]), Value::from(1)).unwrap();
    tx.commit().unwrap();

    assert_eq!(tx.status(), TransactionStatus::Committed);
    assert!(matches!(
        tx.set(tuple(&["b"]), Value::Null),
        Err(Error::TransactionClosed { .. })
    ));
    assert!(tx.commit().unwrap_err().is_usage_error());
}

#[test]
fn failed_commit_closes_transaction() {
    let client = client();
    let mut tx = client.transact();
    tx.scan(Bounds::new()).unwrap();
    client
        .commit(WriteOps::new().with_set(tuple(&["z"]), Value::Null), None)
        .unwrap();

    assert!(tx.commit().is_err());
    assert_eq!(tx.status(), TransactionStatus::Aborted);
    assert!(tx.get(tuple(&["z"])).is_err());
}

#[test]
fn cancel_discards_writes() {
    let client = client();
    let mut tx = client.transact();
    tx.set(tuple(&["a"]), Value::from(1)).unwrap();
    tx.cancel().unwrap();

    assert_eq!(tx.status(), TransactionStatus::Cancelled);
    assert_eq!(client.get(tuple(&["a"])).unwrap(), None);
    assert!(tx.cancel().is_err());
}

#[test]
fn dropping_open_transaction_cancels_it() {
    let client = client();
    {
        let mut tx = client.transact();
        tx.scan(Bounds::new()).unwrap();
    }
    let metrics = client.database().metrics();
    assert_eq!(metrics.total_started, 1);
    assert_eq!(metrics.total_cancelled, 1);
    assert_eq!(metrics.active_count, 0);
}

#[test]
fn metrics_track_outcomes() {
    let client = client();

    let mut ok = client.transact();
    ok.set(tuple(&["a"]), Value::Null).unwrap();
    ok.commit().unwrap();

    let mut loser = client.transact();
    loser.scan(Bounds::new()).unwrap();
    client
        .commit(WriteOps::new().with_set(tuple(&["b"]), Value::Null), None)
        .unwrap();
    assert!(loser.commit().is_err());

    let metrics = client.database().metrics();
    assert_eq!(metrics.total_committed, 1);
    assert_eq!(metrics.total_conflicted, 1);
    assert_eq!(metrics.total_completed(), 2);
    assert!((metrics.conflict_rate() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn caller_chosen_transaction_id() {
    let client = client();
    let id = TxId::new();
    let recorder = Recorder::new();
    let _sub = client.subscribe(Bounds::new(), recorder.callback()).unwrap();

    let mut tx = client.transact_with_id(id);
    assert_eq!(tx.id(), id);
    tx.set(tuple(&["a"]), Value::Null).unwrap();
    tx.commit().unwrap();

    assert_eq!(recorder.calls()[0].1, id);
}

#[test]
fn closed_database_rejects_operations() {
    let client = client();
    client.close().unwrap();
    assert!(client.scan(Bounds::new()).is_err());
    assert!(client
        .commit(WriteOps::new().with_set(tuple(&["a"]), Value::Null), None)
        .is_err());
    assert!(client.close().is_err());
}

#[test]
fn commit_through_trait_object() {
    let client = client();
    let mut tx = client.transact();
    {
        let ops: &mut dyn TransactionOps = &mut tx;
        ops.set(tuple(&["k"]), Value::from("v")).unwrap();
        assert_eq!(ops.get(tuple(&["k"])).unwrap(), Some(Value::from("v")));
    }
    tx.commit().unwrap();
    assert_eq!(client.get(tuple(&["k"])).unwrap(), Some(Value::from("v")));
}

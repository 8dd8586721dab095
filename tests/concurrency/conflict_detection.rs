//! Conflict Detection Tests
//!
//! A commit fails exactly when a logged write falls inside one of its read
//! bounds. A write is logged only while some open read covers it.

use crate::common::*;
use tupledb::prelude::*;
use tupledb::{ConcurrencyLog, Error};

#[test]
fn concurrent_write_into_read_range_conflicts() {
    let client = client_with(&[(&["score", "ada"], Value::from(1))]);

    let mut reader = client.transact();
    let rows = reader.scan(Bounds::prefix(tuple(&["score"]))).unwrap();
    assert_eq!(rows.len(), 1);

    let mut writer = client.transact();
    writer.set(tuple(&["score", "bob"]), Value::from(2)).unwrap();
    writer.commit().unwrap();

    reader.set(tuple(&["total"]), Value::from(1)).unwrap();
    let err = reader.commit().unwrap_err();
    assert!(err.is_retryable());
    match err {
        Error::ReadWriteConflict {
            writer_tx_id,
            tuple: written,
            ..
        } => {
            assert_eq!(writer_tx_id, writer.id());
            assert_eq!(written, tuple(&["score", "bob"]));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(client.database().metrics().total_conflicted, 1);
    assert_eq!(client.get(tuple(&["total"])).unwrap(), None);
}

#[test]
fn write_outside_read_range_does_not_conflict() {
    let client = client();

    let mut reader = client.transact();
    reader.scan(Bounds::prefix(tuple(&["a"]))).unwrap();

    client
        .commit(WriteOps::new().with_set(tuple(&["b", "1"]), Value::Null), None)
        .unwrap();

    reader.set(tuple(&["a", "1"]), Value::Null).unwrap();
    reader.commit().unwrap();
}

#[test]
fn uncovered_write_before_read_does_not_conflict() {
    let client = client();

    let mut reader = client.transact();
    client
        .commit(WriteOps::new().with_set(tuple(&["a"]), Value::from(1)), None)
        .unwrap();

    assert_eq!(reader.get(tuple(&["a"])).unwrap(), Some(Value::from(1)));
    reader.set(tuple(&["b"]), Value::from(2)).unwrap();
    reader.commit().unwrap();
}

#[test]
fn covered_write_conflicts_with_later_read() {
    let client = client();

    let mut watcher = client.transact();
    watcher.scan(Bounds::prefix(tuple(&["a"]))).unwrap();

    client
        .commit(WriteOps::new().with_set(tuple(&["a", "1"]), Value::from(1)), None)
        .unwrap();

    let mut reader = client.transact();
    assert_eq!(reader.get(tuple(&["a", "1"])).unwrap(), Some(Value::from(1)));
    reader.set(tuple(&["b"]), Value::from(2)).unwrap();
    assert!(reader.commit().unwrap_err().is_conflict());

    watcher.cancel().unwrap();
    assert_eq!(client.database().log_len(), 0);
}

#[test]
fn point_read_conflicts_on_remove() {
    let client = client_with(&[(&["flag"], Value::from(true))]);

    let mut reader = client.transact();
    assert!(reader.exists(tuple(&["flag"])).unwrap());

    client
        .commit(WriteOps::new().with_remove(tuple(&["flag"])), None)
        .unwrap();

    assert!(reader.commit().unwrap_err().is_conflict());
}

#[test]
fn subspace_reads_conflict_on_absolute_keys() {
    let client = client();
    let users = client.subspace(tuple(&["users"]));

    let mut reader = users.transact();
    reader.scan(Bounds::new()).unwrap();

    client
        .commit(WriteOps::new().with_set(tuple(&["users", "eve"]), Value::Null), None)
        .unwrap();

    assert!(reader.commit().unwrap_err().is_conflict());
}

#[test]
fn first_committer_wins() {
    let client = client_with(&[(&["counter"], Value::from(0))]);

    let mut a = client.transact();
    let mut b = client.transact();
    let va = a.get(tuple(&["counter"])).unwrap().and_then(|v| v.as_number()).unwrap();
    let vb = b.get(tuple(&["counter"])).unwrap().and_then(|v| v.as_number()).unwrap();

    a.set(tuple(&["counter"]), Value::from(va + 1.0)).unwrap();
    b.set(tuple(&["counter"]), Value::from(vb + 1.0)).unwrap();

    a.commit().unwrap();
    assert!(b.commit().unwrap_err().is_conflict());
    assert_eq!(client.get(tuple(&["counter"])).unwrap(), Some(Value::from(1.0)));
}

#[test]
fn log_is_collected_once_readers_finish() {
    let client = client();

    let mut reader = client.transact();
    reader.scan(Bounds::new()).unwrap();
    client
        .commit(WriteOps::new().with_set(tuple(&["x"]), Value::Null), None)
        .unwrap();
    assert!(client.database().log_len() > 0);

    reader.cancel().unwrap();
    client
        .commit(WriteOps::new().with_set(tuple(&["y"]), Value::Null), None)
        .unwrap();
    assert_eq!(client.database().log_len(), 0);
}

#[test]
fn raw_log_reports_first_conflicting_write() {
    let mut log = ConcurrencyLog::new();
    let reader = TxId::new();
    let w1 = TxId::new();
    let w2 = TxId::new();

    log.read(reader, Bounds::prefix(tuple(&["k"])).normalize());
    log.write(w1, tuple(&["k", "1"]));
    log.write(w2, tuple(&["k", "2"]));

    let conflict = log.commit(reader).unwrap_err();
    assert_eq!(conflict.writer_tx_id, w1);
    assert_eq!(conflict.tuple, tuple(&["k", "1"]));
}

//! Retry Combinator Tests

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::common::*;
use tupledb::prelude::*;
use tupledb::{transactional_read, transactional_read_write, transactional_write, Error};

#[test]
fn conflicting_body_runs_max_retries_plus_one_times() {
    let client = client();
    let attempts = AtomicUsize::new(0);

    let err = transactional_read_write(&fast_retry(3), &client, |tx| {
        let n = attempts.fetch_add(1, Ordering::SeqCst);
        tx.scan(Bounds::prefix(tuple(&["hot"])))?;
        client.commit(
            WriteOps::new().with_set(vec![Value::from("hot"), Value::from(n as i64)], Value::Null),
            None,
        )?;
        tx.set(tuple(&["out"]), Value::Null)
    })
    .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    assert_eq!(client.get(tuple(&["out"])).unwrap(), None);
}

#[test]
fn retry_succeeds_once_contention_stops() {
    let client = client();
    let attempts = AtomicUsize::new(0);

    let value = transactional_read_write(&fast_retry(5), &client, |tx| {
        let n = attempts.fetch_add(1, Ordering::SeqCst);
        let current = tx.get(tuple(&["n"]))?;
        if n < 2 {
            client.commit(
                WriteOps::new().with_set(tuple(&["n"]), Value::from(n as i64)),
                None,
            )?;
        }
        tx.set(tuple(&["n"]), Value::from(100))?;
        Ok(current)
    })
    .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(value, Some(Value::from(1i64)));
    assert_eq!(client.get(tuple(&["n"])).unwrap(), Some(Value::from(100)));
}

#[test]
fn body_error_is_returned_without_retry() {
    let client = client();
    let attempts = AtomicUsize::new(0);

    let err = transactional_read_write(&fast_retry(3), &client, |tx| -> tupledb::Result<()> {
        attempts.fetch_add(1, Ordering::SeqCst);
        tx.set(tuple(&["a"]), Value::Null)?;
        Err(Error::internal("boom"))
    })
    .unwrap_err();

    assert!(matches!(err, Error::Internal { .. }));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(client.get(tuple(&["a"])).unwrap(), None);
}

#[test]
fn nested_call_runs_inside_outer_transaction() {
    let client = client();
    let mut outer = client.transact();

    transactional_write(&fast_retry(3), &mut outer, |tx| {
        tx.set(tuple(&["inner"]), Value::from(1))
    })
    .unwrap();
    assert_eq!(client.get(tuple(&["inner"])).unwrap(), None);

    let seen = transactional_read(&fast_retry(3), &mut outer, |tx| tx.get(tuple(&["inner"]))).unwrap();
    assert_eq!(seen, Some(Value::from(1)));

    outer.commit().unwrap();
    assert_eq!(client.get(tuple(&["inner"])).unwrap(), Some(Value::from(1)));
}

#[test]
fn subspace_client_scopes_combinator() {
    let client = client();
    let users = client.subspace(tuple(&["users"]));

    transactional_write(&fast_retry(0), &users, |tx| {
        tx.set(tuple(&["ada"]), Value::from(36))
    })
    .unwrap();

    assert_eq!(
        client.get(tuple(&["users", "ada"])).unwrap(),
        Some(Value::from(36))
    );
}

//! Reactivity Tests
//!
//! Subscribers receive exactly the committed writes inside their bounds,
//! once per commit, after the commit is visible.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::*;
use tupledb::prelude::*;
use tupledb::{callback, CallbackError};

#[test]
fn subscriber_receives_only_writes_in_range() {
    let client = client();
    let recorder = Recorder::new();
    let _sub = client
        .subscribe(Bounds::prefix(tuple(&["score"])), recorder.callback())
        .unwrap();

    let mut tx = client.transact();
    tx.set(tuple(&["score", "ada"]), Value::from(1)).unwrap();
    tx.set(tuple(&["other"]), Value::from(2)).unwrap();
    tx.remove(tuple(&["score", "bob"])).unwrap();
    tx.commit().unwrap();

    let writes = recorder.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(
        writes[0],
        WriteOps::new()
            .with_set(tuple(&["score", "ada"]), Value::from(1))
            .with_remove(tuple(&["score", "bob"]))
    );
}

#[test]
fn unmatched_subscriber_is_not_called() {
    let client = client();
    let recorder = Recorder::new();
    let _sub = client
        .subscribe(Bounds::prefix(tuple(&["x"])), recorder.callback())
        .unwrap();

    client
        .commit(WriteOps::new().with_set(tuple(&["y"]), Value::Null), None)
        .unwrap();
    assert_eq!(recorder.count(), 0);
}

#[test]
fn conflicted_commit_emits_nothing() {
    let client = client();
    let recorder = Recorder::new();
    let _sub = client.subscribe(Bounds::new(), recorder.callback()).unwrap();

    let mut tx = client.transact();
    tx.scan(Bounds::new()).unwrap();
    client
        .commit(WriteOps::new().with_set(tuple(&["a"]), Value::Null), None)
        .unwrap();
    tx.set(tuple(&["b"]), Value::Null).unwrap();
    assert!(tx.commit().is_err());

    assert_eq!(recorder.count(), 1);
}

#[test]
fn callback_sees_committed_state() {
    let client = client();
    let observed = Arc::new(Mutex::new(None));
    let reader = client.clone();
    let slot = Arc::clone(&observed);
    let _sub = client
        .subscribe(
            Bounds::new(),
            callback(move |_, _| {
                *slot.lock() = Some(reader.get(tuple(&["k"]))?);
                Ok(())
            }),
        )
        .unwrap();

    client
        .commit(WriteOps::new().with_set(tuple(&["k"]), Value::from("v")), None)
        .unwrap();
    assert_eq!(*observed.lock(), Some(Some(Value::from("v"))));
}

#[test]
fn failing_and_panicking_callbacks_are_isolated() {
    let client = client();
    let recorder = Recorder::new();
    let _failing = client
        .subscribe(
            Bounds::new(),
            callback(|_, _| Err::<(), CallbackError>("subscriber failed".into())),
        )
        .unwrap();
    let _panicking = client
        .subscribe(Bounds::new(), callback(|_, _| panic!("subscriber panicked")))
        .unwrap();
    let _ok = client.subscribe(Bounds::new(), recorder.callback()).unwrap();

    client
        .commit(WriteOps::new().with_set(tuple(&["a"]), Value::Null), None)
        .unwrap();

    assert_eq!(recorder.count(), 1);
    assert_eq!(client.get(tuple(&["a"])).unwrap(), Some(Value::Null));
}

#[test]
fn unsubscribe_stops_notifications() {
    let client = client();
    let recorder = Recorder::new();
    let sub = client.subscribe(Bounds::new(), recorder.callback()).unwrap();
    assert_eq!(client.database().subscription_count(), 1);

    client
        .commit(WriteOps::new().with_set(tuple(&["a"]), Value::Null), None)
        .unwrap();
    sub.unsubscribe();
    sub.unsubscribe();
    assert!(sub.is_unsubscribed());
    assert_eq!(client.database().subscription_count(), 0);

    client
        .commit(WriteOps::new().with_set(tuple(&["b"]), Value::Null), None)
        .unwrap();
    assert_eq!(recorder.count(), 1);
}

#[test]
fn subspace_subscriber_sees_relative_keys() {
    let client = client();
    let users = client.subspace(tuple(&["users"]));
    let recorder = Recorder::new();
    let _sub = users.subscribe(Bounds::new(), recorder.callback()).unwrap();

    let mut tx = client.transact();
    tx.set(tuple(&["users", "ada"]), Value::from(1)).unwrap();
    tx.set(tuple(&["posts", "1"]), Value::from(2)).unwrap();
    tx.commit().unwrap();

    assert_eq!(
        recorder.writes(),
        vec![WriteOps::new().with_set(tuple(&["ada"]), Value::from(1))]
    );
}

#[test]
fn subscribe_rejects_inverted_bounds() {
    let client = client();
    let recorder = Recorder::new();
    assert!(client
        .subscribe(
            Bounds::new().gt(tuple(&["z"])).lt(tuple(&["a"])),
            recorder.callback()
        )
        .is_err());
}

//! Async Engine Tests
//!
//! The async flavour shares the commit protocol of the sync engine over an
//! awaited storage adapter.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::*;
use tupledb::{
    async_callback, transactional_read_write_async, AsyncTupleDatabase, AsyncTupleDatabaseClient,
    CallbackError, InMemoryTupleStorage, SyncAdapter,
};

type Client = AsyncTupleDatabaseClient<SyncAdapter<InMemoryTupleStorage>>;

fn async_client() -> Client {
    init_tracing();
    let db = AsyncTupleDatabase::new(SyncAdapter::new(InMemoryTupleStorage::new()));
    AsyncTupleDatabaseClient::new(Arc::new(db))
}

#[tokio::test]
async fn conflict_detected_across_tasks() {
    let client = async_client();
    client
        .commit(WriteOps::new().with_set(tuple(&["n"]), Value::from(0)), None)
        .await
        .unwrap();

    let mut reader = client.transact();
    assert_eq!(reader.get(tuple(&["n"])).await.unwrap(), Some(Value::from(0)));

    let writer = client.clone();
    tokio::spawn(async move {
        let mut tx = writer.transact();
        tx.set(tuple(&["n"]), Value::from(1)).unwrap();
        tx.commit().await
    })
    .await
    .unwrap()
    .unwrap();

    reader.set(tuple(&["n"]), Value::from(2)).unwrap();
    assert!(reader.commit().await.unwrap_err().is_conflict());
    assert_eq!(client.get(tuple(&["n"])).await.unwrap(), Some(Value::from(1)));
}

#[tokio::test]
async fn async_subscriber_receives_relative_writes() {
    let client = async_client();
    let users = client.subspace(tuple(&["users"]));
    let seen: Arc<Mutex<Vec<WriteOps>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let _sub = users
        .subscribe(
            Bounds::new(),
            async_callback(move |writes, _| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().push(writes);
                    Ok::<(), CallbackError>(())
                }
            }),
        )
        .unwrap();

    client
        .commit(
            WriteOps::new()
                .with_set(tuple(&["users", "ada"]), Value::from(1))
                .with_set(tuple(&["posts", "1"]), Value::from(2)),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        *seen.lock(),
        vec![WriteOps::new().with_set(tuple(&["ada"]), Value::from(1))]
    );
}

#[tokio::test]
async fn concurrent_increments_serialize_through_retries() {
    let client = async_client();
    client
        .commit(WriteOps::new().with_set(tuple(&["counter"]), Value::from(0)), None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            // Backoff lets conflicted tasks drop their reads so stale writes drain
            let config = RetryConfig::new()
                .with_max_retries(1_000)
                .with_base_delay_ms(1)
                .with_max_delay_ms(5);
            transactional_read_write_async(&config, &client, |tx| {
                Box::pin(async move {
                    let current = tx
                        .get(tuple(&["counter"]))
                        .await?
                        .and_then(|v| v.as_number())
                        .unwrap_or(0.0);
                    tokio::task::yield_now().await;
                    tx.set(tuple(&["counter"]), Value::from(current + 1.0))
                })
            })
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(
        client.get(tuple(&["counter"])).await.unwrap(),
        Some(Value::from(8.0))
    );
    assert_eq!(client.database().log_len(), 0);
}

#[tokio::test]
async fn closed_async_database_rejects_commits() {
    let client = async_client();
    client.close().await.unwrap();
    assert!(client
        .commit(WriteOps::new().with_set(tuple(&["a"]), Value::Null), None)
        .await
        .is_err());
}

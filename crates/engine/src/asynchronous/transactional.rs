//! Async retry-wrapped transactional combinators

use tracing::{debug, warn};

use tupledb_core::{Error, Result};
use tupledb_storage::AsyncTupleStorage;

use super::{
    AsyncTransaction, AsyncTransactionReader, AsyncTransactionWriter, AsyncTupleDatabaseClient,
    BoxFuture,
};
use crate::database::RetryConfig;

/// Where an async transactional function runs
pub enum AsyncTxContext<'a, S: AsyncTupleStorage> {
    /// Open a root transaction per attempt and commit it
    Client(&'a AsyncTupleDatabaseClient<S>),
    /// Run inside this transaction without committing
    Transaction(&'a mut AsyncTransaction<S>),
}

impl<'a, S: AsyncTupleStorage> From<&'a AsyncTupleDatabaseClient<S>> for AsyncTxContext<'a, S> {
    fn from(client: &'a AsyncTupleDatabaseClient<S>) -> Self {
        AsyncTxContext::Client(client)
    }
}

impl<'a, S: AsyncTupleStorage> From<&'a mut AsyncTransaction<S>> for AsyncTxContext<'a, S> {
    fn from(tx: &'a mut AsyncTransaction<S>) -> Self {
        AsyncTxContext::Transaction(tx)
    }
}

/// Run `f` in a transaction, retrying the whole body on conflict
///
/// Inside an existing transaction `f` is awaited directly and nothing is
/// committed.
///
/// # Example
///
/// ```text
/// transactional_read_write_async(&config, &client, |tx| Box::pin(async move {
///     tx.set(vec!["a".into()], 1.into())?;
///     tx.get(vec!["a".into()]).await
/// })).await?;
/// ```
pub async fn transactional_read_write_async<'a, S, T, F>(
    config: &RetryConfig,
    ctx: impl Into<AsyncTxContext<'a, S>>,
    mut f: F,
) -> Result<T>
where
    S: AsyncTupleStorage + 'a,
    F: for<'t> FnMut(&'t mut AsyncTransaction<S>) -> BoxFuture<'t, Result<T>>,
{
    let client = match ctx.into() {
        AsyncTxContext::Transaction(tx) => return f(tx).await,
        AsyncTxContext::Client(client) => client,
    };

    for attempt in 0..=config.max_retries {
        let mut tx = client.transact();
        let value = match f(&mut tx).await {
            Ok(value) => value,
            Err(e) => {
                debug!(target: "tupledb::txn", tx_id = %tx.id(), error = %e, "Transaction body failed");
                return Err(e);
            }
        };

        match tx.commit().await {
            Ok(()) => return Ok(value),
            Err(e) if e.is_conflict() && attempt < config.max_retries => {
                let delay = config.calculate_delay(attempt);
                warn!(
                    target: "tupledb::txn",
                    tx_id = %tx.id(),
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Conflict, retrying transaction"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    // The final attempt always returns above
    Err(Error::internal("retry loop exited without returning a result"))
}

/// Run `f` with read-only access, retrying on conflict
///
/// A read-only transaction still commits so its reads are checked.
pub async fn transactional_read_async<'a, S, T, F>(
    config: &RetryConfig,
    ctx: impl Into<AsyncTxContext<'a, S>>,
    mut f: F,
) -> Result<T>
where
    S: AsyncTupleStorage + 'a,
    F: for<'t> FnMut(AsyncTransactionReader<'t, S>) -> BoxFuture<'t, Result<T>>,
{
    transactional_read_write_async(config, ctx, |tx| f(AsyncTransactionReader::new(tx))).await
}

/// Run `f` with write-only access, retrying on conflict
pub async fn transactional_write_async<'a, S, T, F>(
    config: &RetryConfig,
    ctx: impl Into<AsyncTxContext<'a, S>>,
    mut f: F,
) -> Result<T>
where
    S: AsyncTupleStorage + 'a,
    F: for<'t> FnMut(AsyncTransactionWriter<'t, S>) -> BoxFuture<'t, Result<T>>,
{
    transactional_read_write_async(config, ctx, |tx| f(AsyncTransactionWriter::new(tx))).await
}

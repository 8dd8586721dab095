//! Retry-wrapped transactional combinators
//!
//! A unit of work is written once against `&mut dyn TransactionOps` (or the
//! read-only / write-only views) and run either:
//! - inside an existing transaction: the function is called directly and
//!   nothing is committed, so composed units never nest commits
//! - from a client: a fresh root transaction is opened, the function runs,
//!   the transaction commits, and a read-write conflict re-runs the whole
//!   function up to `max_retries` more times
//!
//! # Example
//!
//! ```text
//! let config = RetryConfig::default();
//! let total = transactional_read_write(&config, &client, |tx| {
//!     let n = tx.get(vec!["counter".into()])?.and_then(|v| v.as_number()).unwrap_or(0.0);
//!     tx.set(vec!["counter".into()], (n + 1.0).into())?;
//!     Ok(n + 1.0)
//! })?;
//! ```

use tracing::{debug, warn};

use tupledb_core::{Error, Result};

use crate::client::TupleDatabaseClient;
use crate::database::RetryConfig;
use crate::transaction::{Transaction, TransactionSubspace};
use crate::transaction_ops::{TransactionOps, TransactionRead, TransactionWrite};

/// Where a transactional function runs
pub enum TxContext<'a> {
    /// Open a root transaction per attempt and commit it
    Client(&'a TupleDatabaseClient),
    /// Run inside this transaction without committing
    Transaction(&'a mut (dyn TransactionOps + 'a)),
}

impl<'a> From<&'a TupleDatabaseClient> for TxContext<'a> {
    fn from(client: &'a TupleDatabaseClient) -> Self {
        TxContext::Client(client)
    }
}

impl<'a> From<&'a mut Transaction> for TxContext<'a> {
    fn from(tx: &'a mut Transaction) -> Self {
        TxContext::Transaction(tx)
    }
}

impl<'a, 'b: 'a> From<&'a mut TransactionSubspace<'b>> for TxContext<'a> {
    fn from(tx: &'a mut TransactionSubspace<'b>) -> Self {
        TxContext::Transaction(tx)
    }
}

impl<'a, 'b: 'a> From<&'a mut (dyn TransactionOps + 'b)> for TxContext<'a> {
    fn from(tx: &'a mut (dyn TransactionOps + 'b)) -> Self {
        TxContext::Transaction(tx)
    }
}

/// Run `f` with read-write access, retrying on conflict
///
/// # Errors
///
/// Returns `f`'s error unchanged (the attempt is cancelled, never retried),
/// a non-conflict commit error, or the last `ReadWriteConflict` once
/// `config.max_retries` retries are exhausted.
pub fn transactional_read_write<'a, T, F>(
    config: &RetryConfig,
    ctx: impl Into<TxContext<'a>>,
    mut f: F,
) -> Result<T>
where
    F: FnMut(&mut dyn TransactionOps) -> Result<T>,
{
    let client = match ctx.into() {
        TxContext::Transaction(tx) => return f(tx),
        TxContext::Client(client) => client,
    };

    for attempt in 0..=config.max_retries {
        let mut tx = client.transact();
        let value = match f(&mut tx) {
            Ok(value) => value,
            Err(e) => {
                // Dropping `tx` cancels it
                debug!(target: "tupledb::txn", tx_id = %tx.id(), error = %e, "Transaction body failed");
                return Err(e);
            }
        };

        match tx.commit() {
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
                    std::thread::sleep(delay);
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
pub fn transactional_read<'a, T, F>(
    config: &RetryConfig,
    ctx: impl Into<TxContext<'a>>,
    mut f: F,
) -> Result<T>
where
    F: FnMut(&mut dyn TransactionRead) -> Result<T>,
{
    transactional_read_write(config, ctx, |tx| f(tx.as_read()))
}

/// Run `f` with write-only access, retrying on conflict
pub fn transactional_write<'a, T, F>(
    config: &RetryConfig,
    ctx: impl Into<TxContext<'a>>,
    mut f: F,
) -> Result<T>
where
    F: FnMut(&mut dyn TransactionWrite) -> Result<T>,
{
    transactional_read_write(config, ctx, |tx| f(tx.as_write()))
}

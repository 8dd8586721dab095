//! Shared test utilities for all integration test suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Once};

use parking_lot::Mutex;
pub use tupledb::{
    Bounds, KeyValuePair, NormalizedBounds, RetryConfig, Tuple, TupleDatabase,
    TupleDatabaseClient, TxId, Value, WriteOps,
};
use tupledb::{callback, Callback};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Install a test-writer tracing subscriber once per test binary.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ============================================================================
// Builders
// ============================================================================

/// Tuple of string components.
pub fn tuple(parts: &[&str]) -> Tuple {
    parts.iter().map(|s| Value::from(*s)).collect()
}

/// Root client over a fresh in-memory database.
pub fn client() -> TupleDatabaseClient {
    init_tracing();
    TupleDatabaseClient::new(Arc::new(TupleDatabase::in_memory()))
}

/// Root client pre-loaded with `rows`.
pub fn client_with(rows: &[(&[&str], Value)]) -> TupleDatabaseClient {
    let client = client();
    let writes = rows.iter().fold(WriteOps::new(), |ops, (key, value)| {
        ops.with_set(tuple(key), value.clone())
    });
    client.commit(writes, None).expect("seed commit");
    client
}

/// Retry config without backoff delays.
pub fn fast_retry(max_retries: usize) -> RetryConfig {
    RetryConfig::new()
        .with_max_retries(max_retries)
        .with_base_delay_ms(0)
}

// ============================================================================
// Subscription recorder
// ============================================================================

/// Records every notification a subscription receives.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(WriteOps, TxId)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that appends to this recorder.
    pub fn callback(&self) -> Callback {
        let calls = Arc::clone(&self.calls);
        callback(move |writes, tx_id| {
            calls.lock().push((writes.clone(), tx_id));
            Ok(())
        })
    }

    pub fn calls(&self) -> Vec<(WriteOps, TxId)> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<WriteOps> {
        self.calls.lock().iter().map(|(w, _)| w.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Keys of `rows`, for compact assertions.
pub fn keys(rows: &[KeyValuePair]) -> Vec<Tuple> {
    rows.iter().map(|kv| kv.key.clone()).collect()
}

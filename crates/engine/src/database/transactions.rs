//! Conflict retry policy
//!
//! `transactional_read_write` and its async, read-only and write-only
//! variants re-run a unit of work when its commit loses a read-write
//! conflict. [`RetryConfig`] bounds how often that happens and how long the
//! retrying caller sleeps first. It is the `[retry]` section of
//! [`TupleDbConfig`](super::TupleDbConfig).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the transactional combinators retry a conflicted transaction
///
/// Each retry opens a fresh root transaction and runs the whole function
/// again. Only `ReadWriteConflict` is retried; storage and usage errors
/// return at once. A retrying caller holds no reads while it sleeps, so
/// under contention a nonzero `base_delay_ms` lets the concurrency log drain
/// the losing writers' stale entries.
///
/// ```toml
/// [retry]
/// max_retries = 10
/// base_delay_ms = 1
/// max_delay_ms = 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = run once)
    pub max_retries: usize,
    /// Sleep before the first retry in milliseconds, doubled per retry
    /// (0 = retry immediately)
    pub base_delay_ms: u64,
    /// Upper bound on any one sleep in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 0,
            max_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    /// Three immediate retries
    pub fn new() -> Self {
        Self::default()
    }

    /// Run once; a conflict is returned to the caller
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set the number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the sleep before the first retry
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set the cap on any one sleep
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Total attempts allowed (first try plus retries)
    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before retry number `attempt + 1`: `base_delay_ms * 2^attempt`,
    /// capped at `max_delay_ms`
    pub(crate) fn calculate_delay(&self, attempt: usize) -> Duration {
        if self.base_delay_ms == 0 {
            return Duration::ZERO;
        }
        let factor = u32::try_from(attempt)
            .ok()
            .and_then(|shift| 1u64.checked_shl(shift))
            .unwrap_or(u64::MAX);
        let delay_ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

//! Engine Integration Tests
//!
//! Tests for the database, client and transaction surface: read-your-writes
//! merging, subspaces, subscriptions, configuration and the async flavour.

#[path = "../common/mod.rs"]
mod common;

mod config;
mod reactivity;
mod read_your_writes;

#[cfg(feature = "async")]
mod async_engine;

//! Core Integration Tests
//!
//! Tests for the value model, comparator, codec and bounds through the
//! public facade.

#[path = "../common/mod.rs"]
mod common;

mod bounds;
mod ordering;

//! Concurrency layer for tupledb
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - ConcurrencyLog: append-only read/write log per engine
//! - Conflict detection at commit time (first committer wins)
//! - Garbage collection of writes no read can conflict with any more
//!
//! There are no locks held across a transaction: reads never block, and a
//! conflicting transaction learns about it only when it commits.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conflict;
pub mod log;

pub use conflict::ReadWriteConflict;
pub use log::{ConcurrencyLog, LogItem};

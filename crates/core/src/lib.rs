//! Core types for tupledb
//!
//! This crate defines the foundational pieces every other layer builds on:
//! - Value: closed tagged union over the six storable kinds
//! - Tuple / TxId / KeyValuePair / WriteOps: the data model
//! - Comparator: total, type-aware ordering of values and tuples
//! - Codec: order-preserving string encoding of values and tuples
//! - Bounds: range descriptions and the shared `contains` predicate
//! - Sorted: binary-search primitives over sorted vectors
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bounds;
pub mod codec;
pub mod compare;
pub mod error;
pub mod sorted;
pub mod types;
pub mod value;

pub use bounds::{Bounds, Endpoint, NormalizedBounds, Sentinel};
pub use codec::{
    decode_tuple, decode_value, encode_endpoint, encode_tuple, encode_value, EncodingOptions,
};
pub use compare::{compare_tuple, compare_value};
pub use error::{Error, Result};
pub use sorted::SearchResult;
pub use types::{prepend, strip_prefix, KeyValuePair, Tuple, TxId, WriteOps};
pub use value::{TypeRank, Value};

//! Configuration Tests
//!
//! TOML configuration drives the encoding of byte-ordered storage and the
//! retry policy handed to the combinators.

use std::sync::Arc;

use tempfile::TempDir;

use crate::common::*;
use tupledb::{Error, TupleDbConfig};

#[test]
fn default_document_matches_defaults() {
    let config = TupleDbConfig::from_toml_str(TupleDbConfig::default_toml()).unwrap();
    assert_eq!(config, TupleDbConfig::default());
}

#[test]
fn partial_document_fills_defaults() {
    let config = TupleDbConfig::from_toml_str("[retry]\nmax_retries = 7\n").unwrap();
    assert_eq!(config.retry.max_retries, 7);
    assert_eq!(config.retry.max_delay_ms, RetryConfig::default().max_delay_ms);
    assert_eq!(config.encoding, TupleDbConfig::default().encoding);
}

#[test]
fn multi_char_delimiter_is_rejected() {
    let err = TupleDbConfig::from_toml_str("[encoding]\ndelimiter = \"ab\"\n").unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn delimiter_equal_to_escape_is_rejected() {
    let err = TupleDbConfig::from_toml_str("[encoding]\ndelimiter = \"|\"\nescape = \"|\"\n")
        .unwrap_err();
    assert!(matches!(err, Error::Encoding { .. }));
}

#[test]
fn file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tupledb.toml");

    let mut config = TupleDbConfig::default();
    config.encoding.delimiter = "|".to_string();
    config.encoding.escape = "\\".to_string();
    config.retry.max_retries = 9;
    config.write_to_file(&path).unwrap();

    assert_eq!(TupleDbConfig::from_file(&path).unwrap(), config);
}

#[test]
fn missing_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = TupleDbConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn configured_database_uses_custom_encoding() {
    let config = TupleDbConfig::from_toml_str(
        "[encoding]\ndelimiter = \"|\"\nescape = \"\\\\\"\n[retry]\nmax_retries = 1\n",
    )
    .unwrap();
    let client = TupleDatabaseClient::new(Arc::new(TupleDatabase::from_config(config).unwrap()));

    client
        .commit(
            WriteOps::new()
                .with_set(tuple(&["a|b", "c"]), Value::from(1))
                .with_set(tuple(&["a\\", "d"]), Value::from(2))
                .with_set(tuple(&["a"]), Value::from(3)),
            None,
        )
        .unwrap();

    assert_eq!(client.get(tuple(&["a|b", "c"])).unwrap(), Some(Value::from(1)));
    assert_eq!(client.get(tuple(&["a\\", "d"])).unwrap(), Some(Value::from(2)));
    assert_eq!(client.get(tuple(&["a"])).unwrap(), Some(Value::from(3)));
    assert_eq!(client.scan(Bounds::new()).unwrap().len(), 3);
    assert_eq!(client.retry_config().max_retries, 1);
}

#[test]
fn disallowed_character_rejects_commit() {
    let config = TupleDbConfig::from_toml_str("[encoding]\ndisallow = [\"\\n\"]\n").unwrap();
    let client = TupleDatabaseClient::new(Arc::new(TupleDatabase::from_config(config).unwrap()));

    let err = client
        .commit(
            WriteOps::new().with_set(tuple(&["line\nbreak"]), Value::Null),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, Error::Encoding { .. }));
    assert!(client.scan(Bounds::new()).unwrap().is_empty());
}

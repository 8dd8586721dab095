//! Database configuration via TOML
//!
//! The embedder passes a [`TupleDbConfig`] in, parsed from a string or a
//! file. Every field has a default, so an empty document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tupledb_core::{EncodingOptions, Error, Result};

use super::transactions::RetryConfig;

/// Tuple encoding settings, mirrored into [`EncodingOptions`].
///
/// Each field holds exactly one character. TOML escapes such as `"\u0000"`
/// are the usual way to write control characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EncodingConfig {
    /// Character terminating each tuple element (default `\u0000`)
    pub delimiter: String,
    /// Character escaping delimiter and escape inside elements (default `\u0001`)
    pub escape: String,
    /// Characters rejected inside string values
    pub disallow: Vec<String>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        let options = EncodingOptions::default();
        Self {
            delimiter: options.delimiter.to_string(),
            escape: options.escape.to_string(),
            disallow: Vec::new(),
        }
    }
}

/// Database configuration.
///
/// # Example
///
/// ```toml
/// [encoding]
/// delimiter = "\u0000"
/// escape = "\u0001"
/// disallow = []
///
/// [retry]
/// max_retries = 3
/// base_delay_ms = 0
/// max_delay_ms = 100
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TupleDbConfig {
    /// Tuple encoding used by byte-ordered storage
    pub encoding: EncodingConfig,
    /// Conflict retry policy for the transactional combinators
    pub retry: RetryConfig,
}

impl TupleDbConfig {
    /// Build validated encoding options.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if a field is not exactly one character, or
    /// an `Encoding` error if the options are inconsistent.
    pub fn encoding_options(&self) -> Result<EncodingOptions> {
        let delimiter = single_char("encoding.delimiter", &self.encoding.delimiter)?;
        let escape = single_char("encoding.escape", &self.encoding.escape)?;
        let disallow = self
            .encoding
            .disallow
            .iter()
            .map(|s| single_char("encoding.disallow", s))
            .collect::<Result<Vec<_>>>()?;
        let options = EncodingOptions::new(delimiter, escape).with_disallow(disallow);
        options.validate()?;
        Ok(options)
    }

    /// The retry policy.
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone()
    }

    /// Parse and validate config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the document cannot be parsed or the
    /// encoding section is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TupleDbConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
        config.encoding_options()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { message } => {
                Error::config(format!("{} (in '{}')", message, path.display()))
            }
            other => other,
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# tupledb configuration

[encoding]
# Character terminating each tuple element in encoded keys
delimiter = "\u0000"
# Character escaping delimiter and escape inside an element
escape = "\u0001"
# Characters rejected inside string values, e.g. ["\n"]
disallow = []

[retry]
# Conflict retries for transactional combinators (attempts = retries + 1)
max_retries = 3
# Exponential backoff between retries, capped at max_delay_ms
base_delay_ms = 0
max_delay_ms = 100
"#
    }
}

fn single_char(field: &str, value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::config(format!(
            "{} must be exactly one character, got {:?}",
            field, value
        ))),
    }
}

//! Order-preserving string encoding for values and tuples
//!
//! ## Format
//!
//! Every value is one ASCII tag followed by a payload. Tags follow the
//! cross-type rank, so comparing two encodings byte-wise first compares kinds:
//!
//! | Tag | Kind | Payload |
//! |-----|------|---------|
//! | `a` | MIN sentinel | none |
//! | `b` | null | none |
//! | `c` | object | tuple of `[key, value]` arrays in key order |
//! | `d` | array | tuple of elements |
//! | `e` | number | 16 lowercase hex digits |
//! | `f` | string | raw string |
//! | `g` | boolean | `true` / `false` |
//! | `z` | MAX sentinel | none |
//!
//! Numbers are the IEEE-754 bits of the canonical value with the sign bit
//! flipped for positives and every bit flipped for negatives. The high three
//! hex digits are the sign and exponent bucket, the low thirteen the
//! mantissa, so hex order is numeric order.
//!
//! A tuple is each element's encoding, escaped, followed by the delimiter.
//! Escaping turns `escape` into `escape escape` and `delimiter` into
//! `escape delimiter`. With the default `\x00` delimiter and `\x01` escape
//! both sort below every other character, which keeps tuple encodings in
//! [`compare_tuple`](crate::compare::compare_tuple) order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bounds::{Endpoint, Sentinel};
use crate::error::{Error, Result};
use crate::types::Tuple;
use crate::value::{canonical_number, Value};

const TAG_MIN: char = 'a';
const TAG_NULL: char = 'b';
const TAG_OBJECT: char = 'c';
const TAG_ARRAY: char = 'd';
const TAG_NUMBER: char = 'e';
const TAG_STRING: char = 'f';
const TAG_BOOLEAN: char = 'g';
const TAG_MAX: char = 'z';

const SIGN_BIT: u64 = 1 << 63;

/// Characters reserved by the tuple encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingOptions {
    /// Element terminator
    pub delimiter: char,
    /// Escape prefix
    pub escape: char,
    /// Characters a backend cannot store; strings containing them fail to encode
    pub disallow: Vec<char>,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            delimiter: '\x00',
            escape: '\x01',
            disallow: Vec::new(),
        }
    }
}

impl EncodingOptions {
    /// Create options with a custom delimiter and escape
    pub fn new(delimiter: char, escape: char) -> Self {
        Self {
            delimiter,
            escape,
            disallow: Vec::new(),
        }
    }

    /// Add disallowed characters (builder style)
    pub fn with_disallow(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.disallow.extend(chars);
        self
    }

    /// Check the options are usable
    pub fn validate(&self) -> Result<()> {
        if self.delimiter == self.escape {
            return Err(Error::encoding(format!(
                "delimiter and escape must differ, both are {:?}",
                self.delimiter
            )));
        }
        for reserved in [self.delimiter, self.escape] {
            if self.disallow.contains(&reserved) {
                return Err(Error::encoding(format!(
                    "reserved character {reserved:?} is also disallowed"
                )));
            }
        }
        Ok(())
    }
}

/// Encode a single value
pub fn encode_value(value: &Value, options: &EncodingOptions) -> Result<String> {
    let mut out = String::new();
    write_value(&mut out, value, options)?;
    Ok(out)
}

/// Encode a tuple
pub fn encode_tuple(tuple: &[Value], options: &EncodingOptions) -> Result<String> {
    let mut out = String::new();
    for value in tuple {
        let element = encode_value(value, options)?;
        push_element(&mut out, &element, options);
    }
    Ok(out)
}

/// Encode a bound endpoint, including its trailing sentinel
///
/// The result sorts against [`encode_tuple`] output the same way the endpoint
/// sorts against tuples, so byte-ordered backends can range-scan directly.
pub fn encode_endpoint(endpoint: &Endpoint, options: &EncodingOptions) -> Result<String> {
    let mut out = encode_tuple(&endpoint.tuple, options)?;
    match endpoint.sentinel {
        Some(Sentinel::Min) => push_element(&mut out, &TAG_MIN.to_string(), options),
        Some(Sentinel::Max) => push_element(&mut out, &TAG_MAX.to_string(), options),
        None => {}
    }
    Ok(out)
}

/// Decode a single value
pub fn decode_value(encoded: &str, options: &EncodingOptions) -> Result<Value> {
    let mut chars = encoded.chars();
    let tag = chars
        .next()
        .ok_or_else(|| Error::decoding("empty value encoding"))?;
    let payload = chars.as_str();

    match tag {
        TAG_NULL => {
            if !payload.is_empty() {
                return Err(Error::decoding(format!("trailing data after null: {payload:?}")));
            }
            Ok(Value::Null)
        }
        TAG_BOOLEAN => match payload {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(Error::decoding(format!("invalid boolean payload {other:?}"))),
        },
        TAG_NUMBER => decode_number(payload).map(Value::Number),
        TAG_STRING => Ok(Value::String(payload.to_string())),
        TAG_ARRAY => decode_tuple(payload, options).map(Value::Array),
        TAG_OBJECT => decode_object(payload, options),
        TAG_MIN | TAG_MAX => Err(Error::decoding("sentinel is not a value")),
        other => Err(Error::decoding(format!("unknown type tag {other:?}"))),
    }
}

/// Decode a tuple
pub fn decode_tuple(encoded: &str, options: &EncodingOptions) -> Result<Tuple> {
    let mut tuple = Vec::new();
    let mut element = String::new();
    let mut chars = encoded.chars();

    while let Some(c) = chars.next() {
        if c == options.escape {
            let escaped = chars
                .next()
                .ok_or_else(|| Error::decoding("dangling escape at end of tuple"))?;
            element.push(escaped);
        } else if c == options.delimiter {
            tuple.push(decode_value(&element, options)?);
            element.clear();
        } else {
            element.push(c);
        }
    }

    if !element.is_empty() {
        return Err(Error::decoding(format!(
            "unterminated tuple element {element:?}"
        )));
    }
    Ok(tuple)
}

fn write_value(out: &mut String, value: &Value, options: &EncodingOptions) -> Result<()> {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(b) => {
            out.push(TAG_BOOLEAN);
            out.push_str(if *b { "true" } else { "false" });
        }
        Value::Number(n) => {
            out.push(TAG_NUMBER);
            out.push_str(&encode_number(*n));
        }
        Value::String(s) => {
            check_allowed(s, options)?;
            out.push(TAG_STRING);
            out.push_str(s);
        }
        Value::Array(items) => {
            out.push(TAG_ARRAY);
            out.push_str(&encode_tuple(items, options)?);
        }
        Value::Object(fields) => {
            out.push(TAG_OBJECT);
            for (key, field) in fields {
                let pair = Value::Array(vec![Value::String(key.clone()), field.clone()]);
                let element = encode_value(&pair, options)?;
                push_element(out, &element, options);
            }
        }
    }
    Ok(())
}

fn push_element(out: &mut String, element: &str, options: &EncodingOptions) {
    for c in element.chars() {
        if c == options.escape || c == options.delimiter {
            out.push(options.escape);
        }
        out.push(c);
    }
    out.push(options.delimiter);
}

fn check_allowed(s: &str, options: &EncodingOptions) -> Result<()> {
    match s.chars().find(|c| options.disallow.contains(c)) {
        Some(c) => Err(Error::encoding(format!("Disallowed character found: {c:?}"))),
        None => Ok(()),
    }
}

fn encode_number(n: f64) -> String {
    let bits = canonical_number(n).to_bits();
    let flipped = if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    };
    format!("{flipped:016x}")
}

fn decode_number(payload: &str) -> Result<f64> {
    if payload.len() != 16 {
        return Err(Error::decoding(format!(
            "number payload must be 16 hex digits, got {payload:?}"
        )));
    }
    let flipped = u64::from_str_radix(payload, 16)
        .map_err(|e| Error::decoding(format!("invalid number payload {payload:?}: {e}")))?;
    let bits = if flipped & SIGN_BIT != 0 {
        flipped & !SIGN_BIT
    } else {
        !flipped
    };
    Ok(f64::from_bits(bits))
}

fn decode_object(payload: &str, options: &EncodingOptions) -> Result<Value> {
    let mut fields = BTreeMap::new();
    for entry in decode_tuple(payload, options)? {
        match entry {
            Value::Array(mut pair) if pair.len() == 2 => {
                let field = pair.pop().unwrap_or(Value::Null);
                match pair.pop() {
                    Some(Value::String(key)) => {
                        fields.insert(key, field);
                    }
                    other => {
                        return Err(Error::decoding(format!(
                            "object key must be a string, got {other:?}"
                        )))
                    }
                }
            }
            other => {
                return Err(Error::decoding(format!(
                    "object entry must be a [key, value] pair, got {other:?}"
                )))
            }
        }
    }
    Ok(Value::Object(fields))
}

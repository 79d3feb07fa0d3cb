//! Data types for the REST key-value client

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{Error, Result};

/// A loosely-typed command result as returned by the service.
///
/// The service only ever answers with strings, numbers, arrays or null;
/// anything else in the `result` field is treated as a decode failure.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// `null`, e.g. a missing key
    #[default]
    Null,
    /// A string
    String(String),
    /// A number without a fractional part
    Integer(i64),
    /// Any other number
    Float(f64),
    /// An array of values
    Array(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in coercion errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Array(_) => "array",
        }
    }

    /// Returns true for [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::Coercion {
            expected,
            found: self.kind(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::String(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, number, array or null")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Value::deserialize(deserializer)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
                Ok(Value::String(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
                Ok(Value::String(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
                Ok(Value::Integer(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
                Ok(i64::try_from(v)
                    .map(Value::Integer)
                    .unwrap_or(Value::Float(v as f64)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
                Ok(Value::Float(v))
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Array(items))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl TryFrom<Value> for Option<String> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(other.mismatch("optional string")),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Integer(n) => Ok(n),
            Value::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(f as i64)
            }
            other => Err(other.mismatch("integer")),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(n) => Ok(n as f64),
            // INCRBYFLOAT answers with the new value as a string
            Value::String(ref s) => s.trim().parse().map_err(|_| value.mismatch("float")),
            other => Err(other.mismatch("float")),
        }
    }
}

impl TryFrom<Value> for Vec<String> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Array(_) => Err(item.mismatch("string list element")),
                    Value::String(s) => Ok(s),
                    other => Ok(other.to_string()),
                })
                .collect(),
            other => Err(other.mismatch("string list")),
        }
    }
}

/// The `{result, error}` wrapper every response arrives in
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// Command result; absent means null
    #[serde(default)]
    pub result: Value,
    /// Error reported by the service, empty or absent on success
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    /// Returns the service error, if one was reported
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}

/// A key and the value to store under it, used by MSET and MSETNX
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key
    pub key: String,
    /// The value
    pub value: String,
}

impl KeyValue {
    /// Create a pair
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for KeyValue {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

/// Modifiers for SET.
///
/// Numeric fields use `0` for "not set". At most one expiry modifier is
/// sent; when several are set the first in this order wins: `ex`, `exat`,
/// `keep_ttl`, `px`, `pxat`. `nx` wins over `xx`. `get` is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Expire time in seconds
    pub ex: u64,
    /// Unix time in seconds at which the key expires
    pub exat: u64,
    /// Retain the time to live already associated with the key
    pub keep_ttl: bool,
    /// Expire time in milliseconds
    pub px: u64,
    /// Unix time in milliseconds at which the key expires
    pub pxat: u64,
    /// Only set the key if it does not already exist
    pub nx: bool,
    /// Only set the key if it already exists
    pub xx: bool,
    /// Return the old value stored at the key
    pub get: bool,
}

impl SetOptions {
    pub(crate) fn apply(&self, cmd: Command) -> Command {
        let cmd = if self.ex != 0 {
            cmd.arg("ex").arg(self.ex)
        } else if self.exat != 0 {
            cmd.arg("exat").arg(self.exat)
        } else if self.keep_ttl {
            cmd.arg("keepttl")
        } else if self.px != 0 {
            cmd.arg("px").arg(self.px)
        } else if self.pxat != 0 {
            cmd.arg("pxat").arg(self.pxat)
        } else {
            cmd
        };

        let cmd = if self.nx {
            cmd.arg("nx")
        } else if self.xx {
            cmd.arg("xx")
        } else {
            cmd
        };

        if self.get {
            cmd.arg("get")
        } else {
            cmd
        }
    }
}

/// Modifiers for GETEX. Only one of these should be set; the first in
/// field order wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetExOptions {
    /// Expire time in seconds
    pub ex: u64,
    /// Unix time in seconds at which the key expires
    pub exat: u64,
    /// Expire time in milliseconds
    pub px: u64,
    /// Unix time in milliseconds at which the key expires
    pub pxat: u64,
    /// Remove the time to live associated with the key
    pub persist: bool,
}

impl GetExOptions {
    pub(crate) fn apply(&self, cmd: Command) -> Command {
        if self.ex != 0 {
            cmd.arg("ex").arg(self.ex)
        } else if self.exat != 0 {
            cmd.arg("exat").arg(self.exat)
        } else if self.px != 0 {
            cmd.arg("px").arg(self.px)
        } else if self.pxat != 0 {
            cmd.arg("pxat").arg(self.pxat)
        } else if self.persist {
            cmd.arg("persist")
        } else {
            cmd
        }
    }
}

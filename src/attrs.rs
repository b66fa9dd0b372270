//! Structured key-value attributes attached to log records.
//!
//! A logger owns an immutable, shared [`Attrs`] set. Binding more attributes
//! produces a new set; per-call attributes are merged into a view for the
//! encoder and never touch the stored base.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    I64(i64),
    /// Unsigned integer.
    U64(u64),
    /// Floating point number.
    F64(f64),
    /// Text.
    Str(String),
    /// Elapsed time, rendered according to the mode profile.
    Duration(Duration),
    /// Arbitrary JSON document.
    Json(serde_json::Value),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I64(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U64(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::U64(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Value::U64(u)
                } else if let Some(i) = n.as_i64() {
                    Value::I64(i)
                } else {
                    Value::F64(n.as_f64().unwrap_or_default())
                }
            }
            other => Value::Json(other),
        }
    }
}

/// A single key-value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    /// Attribute name.
    pub key: String,
    /// Attribute value.
    pub value: Value,
}

impl Attr {
    /// Create an attribute.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Shorthand for [`Attr::new`].
pub fn attr(key: impl Into<String>, value: impl Into<Value>) -> Attr {
    Attr::new(key, value)
}

/// Convert a configuration attribute map into attributes, in key order.
pub fn to_attrs(data: &BTreeMap<String, serde_json::Value>) -> Vec<Attr> {
    data.iter()
        .map(|(key, value)| Attr::new(key.clone(), value.clone()))
        .collect()
}

/// Immutable attribute set bound to a logger.
#[derive(Debug, Clone, Default)]
pub struct Attrs {
    inner: Arc<Vec<Attr>>,
}

impl Attrs {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding `attrs` in the given order.
    pub fn from_vec(attrs: Vec<Attr>) -> Self {
        Self {
            inner: Arc::new(attrs),
        }
    }

    /// A new set with `extra` appended. `self` is left untouched.
    pub fn with(&self, extra: impl IntoIterator<Item = Attr>) -> Self {
        let mut attrs: Vec<Attr> = self.inner.as_ref().clone();
        attrs.extend(extra);
        Self::from_vec(attrs)
    }

    /// The bound attributes.
    pub fn as_slice(&self) -> &[Attr] {
        &self.inner
    }

    /// Whether no attribute is bound.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The view handed to the encoder: base attributes first, with values
    /// shadowed by same-named per-call attributes, then the remaining
    /// per-call attributes in call order. Within either group a later
    /// binding of a key replaces an earlier one.
    pub fn merged<'a>(&'a self, per_call: &'a [Attr]) -> Vec<(&'a str, &'a Value)> {
        let mut out: Vec<(&str, &Value)> = Vec::with_capacity(self.inner.len() + per_call.len());
        for base in self.inner.iter() {
            if out.iter().any(|(k, _)| *k == base.key) {
                continue;
            }
            let value = per_call
                .iter()
                .rev()
                .chain(self.inner.iter().rev())
                .find(|a| a.key == base.key)
                .map_or(&base.value, |a| &a.value);
            out.push((base.key.as_str(), value));
        }
        for (i, call) in per_call.iter().enumerate() {
            if self.inner.iter().any(|b| b.key == call.key) {
                continue;
            }
            // last write wins among duplicate per-call keys
            if per_call[i + 1..].iter().any(|a| a.key == call.key) {
                continue;
            }
            out.push((call.key.as_str(), &call.value));
        }
        out
    }
}

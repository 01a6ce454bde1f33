//! Get-or-default accessors over provider JSON documents.
//!
//! Provider payloads are pervasively optional: any key may be missing, explicitly
//! `null`, or carry an unexpected type. Every lookup in the normalizer goes through
//! [`DocumentExt`] so that absent and malformed values collapse to the same default.

use serde_json::Value;
use tracing::trace;

pub trait DocumentExt {
    /// Returns the value under `key`, treating `null` the same as a missing key.
    fn field(&self, key: &str) -> Option<&Value>;

    /// Walks nested objects, returning `None` as soon as a segment is absent or null.
    fn path(&self, keys: &[&str]) -> Option<&Value>;

    fn str_or_default(&self, key: &str) -> String;

    fn f64_or_default(&self, key: &str) -> f64;

    /// Elements of the array at `keys`, or an empty slice when the path does not
    /// resolve to an array.
    fn array_at(&self, keys: &[&str]) -> &[Value];
}

impl DocumentExt for Value {
    fn field(&self, key: &str) -> Option<&Value> {
        self.as_object()
            .and_then(|map| map.get(key))
            .filter(|value| !value.is_null())
    }

    fn path(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .try_fold(self, |current, key| current.field(key))
    }

    fn str_or_default(&self, key: &str) -> String {
        match self.field(key) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => {
                trace!(key, found = %kind(other), "expected string field; using default");
                String::new()
            }
            None => String::new(),
        }
    }

    fn f64_or_default(&self, key: &str) -> f64 {
        match self.field(key) {
            Some(Value::Number(number)) => number.as_f64().unwrap_or_default(),
            Some(Value::String(text)) => text.trim().parse::<f64>().unwrap_or_else(|_| {
                trace!(key, value = %text, "non-numeric text in numeric field; using default");
                0.0
            }),
            Some(other) => {
                trace!(key, found = %kind(other), "expected numeric field; using default");
                0.0
            }
            None => 0.0,
        }
    }

    fn array_at(&self, keys: &[&str]) -> &[Value] {
        match self.path(keys) {
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) => {
                trace!(path = ?keys, found = %kind(other), "expected array; treating as empty");
                &[]
            }
            None => &[],
        }
    }
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

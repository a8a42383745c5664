//! Formatted field values and their mapping to BSON.
//!
//! Coercion runs in two tiers. Scalars, dates and binary data map straight to
//! a native BSON value. Composite values have no native mapping and are
//! serialized structurally into a sub-document or array instead.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::{self, spec::BinarySubtype, Binary, Bson, Document};
use serde::Serialize;
use serde_json::Value;

use crate::error::CoercionError;

/// A value produced by formatting a log event.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Binary(Vec<u8>),
    /// Named sub-values, e.g. exception details or event properties.
    Map(BTreeMap<String, FieldValue>),
    /// Arbitrary serialized data.
    Structured(Value),
}

impl FieldValue {
    /// Capture any serializable value.
    ///
    /// Values serde cannot represent (maps with non-string keys, failing
    /// `Serialize` impls) become their error text.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => FieldValue::Structured(v),
            Err(e) => FieldValue::Text(format!("<unserializable: {e}>")),
        }
    }

    /// Map to a native BSON value, failing for composite values.
    pub fn to_native(&self) -> Result<Bson, CoercionError> {
        match self {
            FieldValue::Null => Ok(Bson::Null),
            FieldValue::Bool(b) => Ok(Bson::Boolean(*b)),
            FieldValue::Int(i) => Ok(Bson::Int64(*i)),
            FieldValue::Float(f) => Ok(Bson::Double(*f)),
            FieldValue::Text(s) => Ok(Bson::String(s.clone())),
            FieldValue::Timestamp(ts) => Ok(Bson::DateTime(bson::DateTime::from_millis(
                ts.timestamp_millis(),
            ))),
            FieldValue::Binary(bytes) => Ok(Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: bytes.clone(),
            })),
            FieldValue::Map(_) => Err(CoercionError::Composite("map")),
            FieldValue::Structured(value) => json_scalar(value),
        }
    }

    /// Serialize structurally. Always succeeds.
    pub fn to_structural(&self) -> Bson {
        match self {
            FieldValue::Map(entries) => {
                let mut doc = Document::new();
                for (key, value) in entries {
                    doc.insert(key.clone(), value.to_bson());
                }
                Bson::Document(doc)
            }
            FieldValue::Structured(value) => {
                bson::to_bson(value).unwrap_or_else(|_| Bson::String(value.to_string()))
            }
            scalar => scalar.to_native().unwrap_or(Bson::Null),
        }
    }

    /// Native mapping first, structural serialization as the fallback.
    pub fn to_bson(&self) -> Bson {
        self.to_native().unwrap_or_else(|_| self.to_structural())
    }

    /// JSON form, used when a value is rendered as text.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Binary(bytes) => Value::from(bytes.clone()),
            FieldValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            FieldValue::Structured(value) => value.clone(),
        }
    }

    /// Plain text rendering for patterns.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Structured(Value::String(s)) => s.clone(),
            other => match other.to_json() {
                Value::String(s) => s,
                json => json.to_string(),
            },
        }
    }
}

fn json_scalar(value: &Value) -> Result<Bson, CoercionError> {
    match value {
        Value::Null => Ok(Bson::Null),
        Value::Bool(b) => Ok(Bson::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Bson::Int64(i)),
            None => Ok(Bson::Double(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => Ok(Bson::String(s.clone())),
        Value::Array(_) => Err(CoercionError::Composite("array")),
        Value::Object(_) => Err(CoercionError::Composite("object")),
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u64> for FieldValue {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => FieldValue::Int(i),
            Err(_) => FieldValue::Text(u.to_string()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(bytes: Vec<u8>) -> Self {
        FieldValue::Binary(bytes)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Structured(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

//! Cell values.
//!
//! A [`Value`] is one cell of a [`crate::Table`]. Columns are heterogeneous
//! `Vec<Value>`s so that raw, not-yet-coerced data (for example CSV text) can
//! be validated and coerced in place.

use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::types::DataType;

/// 2^63; integral floats below this convert to `i64` exactly.
const I64_FLOAT_BOUND: f64 = 9_223_372_036_854_775_808.0;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// A single cell.
///
/// `Float64(NaN)` is treated as a missing marker, the same as `Null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    /// Tz-aware instant, normalized to UTC
    TimestampTz(DateTime<Utc>),
    Time(NaiveTime),
    Binary(Vec<u8>),
}

impl Value {
    /// Null or NaN.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float64(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Name of the value's runtime type (`"null"` for missing markers).
    pub fn type_name(&self) -> &'static str {
        if self.is_null() {
            return "null";
        }
        match self.data_type() {
            Some(dt) => dt.kind(),
            None => "null",
        }
    }

    /// The data type this value naturally belongs to, if not null.
    pub fn data_type(&self) -> Option<DataType> {
        let dt = match self {
            Value::Null => return None,
            Value::Float64(f) if f.is_nan() => return None,
            Value::Boolean(_) => DataType::Boolean,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::String(_) => DataType::String,
            Value::Date(_) => DataType::Date,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::TimestampTz(_) => DataType::TimestampTz {
                tz: "UTC".to_string(),
            },
            Value::Time(_) => DataType::Time,
            Value::Binary(_) => DataType::Binary,
        };
        Some(dt)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(i) => Some(*i as f64),
            Value::Float64(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    /// Order two values.
    ///
    /// Integers and floats compare numerically with each other; any other pair
    /// of different types (and anything involving a null) is unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        match (self, other) {
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Int64(a), Value::Float64(b)) => (*a as f64).partial_cmp(b),
            (Value::Float64(a), Value::Int64(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::TimestampTz(a), Value::TimestampTz(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality that treats `1` and `1.0` as equal. Nulls are never equal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Canonical text form, used for string coercion and report rendering.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Float64(f) if f.is_nan() => "NaN".to_string(),
            Value::Float64(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            Value::TimestampTz(ts) => ts.to_rfc3339(),
            Value::Time(t) => t.format(TIME_FORMAT).to_string(),
            Value::Binary(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Key for duplicate detection. Agrees with [`Value::loose_eq`] on
    /// numbers (`1`, `1.0` and `-0.0`/`0.0` share a key) and maps every
    /// missing marker to the same key.
    pub fn unique_key(&self) -> String {
        match self {
            v if v.is_null() => "null".to_string(),
            Value::Int64(i) => format!("number:{}", i),
            Value::Float64(f) if f.fract() == 0.0 && f.abs() < I64_FLOAT_BOUND => {
                format!("number:{}", *f as i64)
            }
            Value::Float64(f) => format!("number:f{:016x}", f.to_bits()),
            other => format!("{}:{}", other.type_name(), other.render()),
        }
    }

    /// Convert a JSON value into a cell. Nested arrays/objects are kept as
    /// their compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int64(i)
                } else {
                    n.as_f64().map(Value::Float64).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }
    }

    /// Convert a cell into JSON, the inverse of [`Value::from_json`] for
    /// scalar types. Temporal and binary values become strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Int64(i) => serde_json::Value::from(*i),
            Value::Float64(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            other => serde_json::Value::String(other.render()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(&json))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

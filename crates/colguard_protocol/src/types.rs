//! Canonical column data types.

use serde::de;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::value::Value;

// ============================================================================
// Data Types (Canonical Definition)
// ============================================================================

/// Canonical data type enum - the SINGLE SOURCE OF TRUTH for declared column types.
///
/// Serialized as a plain string for simple types (`"int64"`) and as an object
/// with a `kind` for parameterized ones (`{"kind": "timestamp_tz", "tz": "UTC"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// Boolean (true/false, yes/no, 1/0)
    Boolean,

    /// 64-bit signed integer
    Int64,

    /// 64-bit floating point
    Float64,

    /// UTF-8 string (default/fallback)
    #[default]
    String,

    /// Date (no time component)
    Date,

    /// Timestamp without timezone (naive)
    Timestamp,

    /// Timestamp with explicit timezone
    TimestampTz { tz: String },

    /// Time only (no date component)
    Time,

    /// Binary data (raw bytes)
    Binary,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataTypeRepr {
    Legacy(String),
    Modern(DataTypeObject),
}

#[derive(Debug, Deserialize)]
struct DataTypeObject {
    pub kind: String,
    #[serde(default)]
    pub tz: Option<String>,
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DataType::TimestampTz { tz } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("kind", "timestamp_tz")?;
                map.serialize_entry("tz", tz)?;
                map.end()
            }
            other => serializer.serialize_str(other.kind()),
        }
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = DataTypeRepr::deserialize(deserializer)?;
        match repr {
            DataTypeRepr::Legacy(raw) => DataType::from_str(&raw).map_err(de::Error::custom),
            DataTypeRepr::Modern(obj) => DataType::from_object(obj).map_err(de::Error::custom),
        }
    }
}

impl DataType {
    /// The kind name used in declarations and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::String => "string",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
            DataType::TimestampTz { .. } => "timestamp_tz",
            DataType::Time => "time",
            DataType::Binary => "binary",
        }
    }

    /// Returns all non-parameterized data types.
    pub fn all() -> Vec<DataType> {
        vec![
            DataType::Boolean,
            DataType::Int64,
            DataType::Float64,
            DataType::String,
            DataType::Date,
            DataType::Timestamp,
            DataType::Time,
            DataType::Binary,
        ]
    }

    /// Returns true if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// Returns true if this type is temporal
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Timestamp | DataType::TimestampTz { .. } | DataType::Time
        )
    }

    /// Whether a cell value already has this type.
    ///
    /// Nulls are accepted by every type; nullability is enforced separately.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, v) if v.is_null() => true,
            (DataType::Boolean, Value::Boolean(_)) => true,
            (DataType::Int64, Value::Int64(_)) => true,
            // Integers widen losslessly into float columns.
            (DataType::Float64, Value::Float64(_) | Value::Int64(_)) => true,
            (DataType::String, Value::String(_)) => true,
            (DataType::Date, Value::Date(_)) => true,
            (DataType::Timestamp, Value::Timestamp(_)) => true,
            // Tz-aware values are stored as UTC instants; any tz-aware value matches.
            (DataType::TimestampTz { .. }, Value::TimestampTz(_)) => true,
            (DataType::Time, Value::Time(_)) => true,
            (DataType::Binary, Value::Binary(_)) => true,
            _ => false,
        }
    }

    fn from_object(obj: DataTypeObject) -> Result<Self, String> {
        match obj.kind.to_lowercase().as_str() {
            "timestamp_tz" => {
                let tz = obj
                    .tz
                    .ok_or_else(|| "timestamp_tz.tz is required".to_string())?;
                DataType::timestamp_tz(tz)
            }
            other => {
                if obj.tz.is_some() {
                    return Err(format!("'{}' does not take a tz parameter", other));
                }
                DataType::from_str(other)
            }
        }
    }

    /// Build a tz-aware timestamp type, validating the IANA timezone name.
    pub fn timestamp_tz(tz: impl Into<String>) -> Result<Self, String> {
        let tz = tz.into();
        if tz.is_empty() {
            return Err("timestamp_tz.tz must be non-empty".to_string());
        }
        if !is_valid_timezone(&tz) {
            return Err(format!(
                "timestamp_tz.tz '{}' is not a valid IANA timezone",
                tz
            ));
        }
        Ok(DataType::TimestampTz { tz })
    }
}

pub(crate) fn is_valid_timezone(tz: &str) -> bool {
    if tz.eq_ignore_ascii_case("utc") {
        return true;
    }
    tz.parse::<chrono_tz::Tz>().is_ok()
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::TimestampTz { tz } => write!(f, "timestamp_tz({})", tz),
            other => f.write_str(other.kind()),
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();
        if lower.starts_with("timestamp_tz(") && lower.ends_with(')') {
            // Keep the caller's casing for the zone name.
            let tz = trimmed
                .get("timestamp_tz(".len()..trimmed.len() - 1)
                .unwrap_or_default();
            return DataType::timestamp_tz(tz.trim());
        }

        let dt = match lower.as_str() {
            "boolean" | "bool" => DataType::Boolean,
            "int64" | "integer" | "int" | "int8" | "int16" | "int32" | "uint8" | "uint16"
            | "uint32" | "uint64" => DataType::Int64,
            "float64" | "float" | "float32" | "double" => DataType::Float64,
            "string" | "str" | "utf8" | "text" | "object" | "category" => DataType::String,
            "date" | "date32" | "date64" => DataType::Date,
            "timestamp" | "datetime" => DataType::Timestamp,
            "time" | "time32" | "time64" => DataType::Time,
            "binary" | "bytes" => DataType::Binary,
            _ => {
                return Err(format!(
                    "Invalid data type: '{}'. Expected: boolean, int64, float64, string, date, timestamp, timestamp_tz(<tz>), time, binary.",
                    s
                ))
            }
        };
        Ok(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_aliases() {
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Int64);
        assert_eq!("UINT32".parse::<DataType>().unwrap(), DataType::Int64);
        assert_eq!("double".parse::<DataType>().unwrap(), DataType::Float64);
        assert_eq!("category".parse::<DataType>().unwrap(), DataType::String);
        assert_eq!("datetime".parse::<DataType>().unwrap(), DataType::Timestamp);
        assert!("decimal".parse::<DataType>().is_err());
    }

    #[test]
    fn test_timestamp_tz_parsing() {
        let dt = "timestamp_tz(America/New_York)".parse::<DataType>().unwrap();
        assert_eq!(
            dt,
            DataType::TimestampTz {
                tz: "America/New_York".to_string()
            }
        );
        assert!("timestamp_tz(Not/AZone)".parse::<DataType>().is_err());
        assert!(DataType::timestamp_tz("").is_err());
    }

    #[test]
    fn test_data_type_serialization() {
        assert_eq!(serde_json::to_string(&DataType::Int64).unwrap(), "\"int64\"");
        let tz = DataType::TimestampTz {
            tz: "UTC".to_string(),
        };
        let json = serde_json::to_string(&tz).unwrap();
        assert_eq!(json, r#"{"kind":"timestamp_tz","tz":"UTC"}"#);
        let back: DataType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tz);

        let legacy: DataType = serde_json::from_str("\"float\"").unwrap();
        assert_eq!(legacy, DataType::Float64);
    }

    #[test]
    fn test_accepts_nulls_for_every_type() {
        for dt in DataType::all() {
            assert!(dt.accepts(&Value::Null), "{} should accept null", dt);
        }
        assert!(!DataType::Int64.accepts(&Value::Float64(1.0)));
        assert!(DataType::Float64.accepts(&Value::Float64(f64::NAN)));
        assert!(DataType::Float64.accepts(&Value::Int64(3)));
    }
}

//! Element-wise casting of cells into a declared type.
//!
//! Casting never fabricates placeholders: a cell either converts cleanly or
//! the cast reports failure and the caller keeps the original cell.

use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::types::DataType;
use crate::value::Value;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Cast one cell into `target`.
///
/// Returns `None` when the cell cannot be represented in `target`. Nulls
/// (including NaN) always cast to `Value::Null`.
pub fn cast_value(value: &Value, target: &DataType) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }

    match target {
        // Integers are accepted by float columns but still stored as floats.
        DataType::Float64 => to_float(value).map(Value::Float64),
        _ if target.accepts(value) => Some(value.clone()),
        DataType::String => Some(Value::String(value.render())),
        DataType::Int64 => to_int(value).map(Value::Int64),
        DataType::Boolean => to_bool(value).map(Value::Boolean),
        DataType::Date => to_date(value).map(Value::Date),
        DataType::Timestamp => to_timestamp(value).map(Value::Timestamp),
        DataType::TimestampTz { tz } => to_timestamp_tz(value, tz).map(Value::TimestampTz),
        DataType::Time => to_time(value).map(Value::Time),
        DataType::Binary => match value {
            Value::String(s) => base64::engine::general_purpose::STANDARD
                .decode(s.trim())
                .ok()
                .map(Value::Binary),
            _ => None,
        },
    }
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int64(i) => Some(*i),
        Value::Float64(f) => {
            let in_range = *f >= i64::MIN as f64 && *f < i64::MAX as f64;
            (f.is_finite() && f.fract() == 0.0 && in_range).then_some(*f as i64)
        }
        Value::Boolean(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int64(i) => Some(*i as f64),
        Value::Float64(f) => Some(*f),
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Int64(0) => Some(false),
        Value::Int64(1) => Some(true),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "t" => Some(true),
            "false" | "0" | "no" | "f" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Timestamp(ts) => Some(ts.date()),
        Value::TimestampTz(ts) => Some(ts.date_naive()),
        Value::String(s) => {
            let s = s.trim();
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        }
        _ => None,
    }
}

fn parse_naive_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(aware) = DateTime::parse_from_rfc3339(s) {
        return Some(aware.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn to_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::TimestampTz(ts) => Some(ts.naive_utc()),
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::String(s) => parse_naive_timestamp(s)
            .or_else(|| to_date(value).and_then(|d| d.and_hms_opt(0, 0, 0))),
        _ => None,
    }
}

fn localize(naive: NaiveDateTime, tz: &str) -> Option<DateTime<Utc>> {
    if tz.eq_ignore_ascii_case("utc") {
        return Some(naive.and_utc());
    }
    let zone: chrono_tz::Tz = tz.parse().ok()?;
    zone.from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

fn to_timestamp_tz(value: &Value, tz: &str) -> Option<DateTime<Utc>> {
    match value {
        Value::TimestampTz(ts) => Some(*ts),
        Value::String(s) => match DateTime::parse_from_rfc3339(s.trim()) {
            Ok(aware) => Some(aware.with_timezone(&Utc)),
            Err(_) => to_timestamp(value).and_then(|naive| localize(naive, tz)),
        },
        Value::Timestamp(_) | Value::Date(_) => {
            to_timestamp(value).and_then(|naive| localize(naive, tz))
        }
        _ => None,
    }
}

fn to_time(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::Time(t) => Some(*t),
        Value::String(s) => {
            let s = s.trim();
            TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_casts() {
        assert_eq!(
            cast_value(&Value::from("42"), &DataType::Int64),
            Some(Value::Int64(42))
        );
        assert_eq!(
            cast_value(&Value::Float64(3.0), &DataType::Int64),
            Some(Value::Int64(3))
        );
        assert_eq!(cast_value(&Value::Float64(3.5), &DataType::Int64), None);
        assert_eq!(
            cast_value(&Value::from(" 0.75 "), &DataType::Float64),
            Some(Value::Float64(0.75))
        );
        assert_eq!(cast_value(&Value::from("abc"), &DataType::Float64), None);
    }

    #[test]
    fn test_nulls_always_cast() {
        for dt in DataType::all() {
            assert_eq!(cast_value(&Value::Null, &dt), Some(Value::Null));
        }
    }

    #[test]
    fn test_boolean_tokens() {
        assert_eq!(
            cast_value(&Value::from("Yes"), &DataType::Boolean),
            Some(Value::Boolean(true))
        );
        assert_eq!(
            cast_value(&Value::Int64(0), &DataType::Boolean),
            Some(Value::Boolean(false))
        );
        assert_eq!(cast_value(&Value::Int64(2), &DataType::Boolean), None);
    }

    #[test]
    fn test_temporal_casts() {
        let date = cast_value(&Value::from("01/15/2024"), &DataType::Date).unwrap();
        assert_eq!(date.render(), "2024-01-15");

        let ts = cast_value(&Value::from("2024-01-15T10:30:00Z"), &DataType::Timestamp).unwrap();
        assert_eq!(ts.render(), "2024-01-15 10:30:00");

        let tz = DataType::TimestampTz {
            tz: "America/New_York".to_string(),
        };
        let aware = cast_value(&Value::from("2024-01-15 10:30:00"), &tz).unwrap();
        assert_eq!(aware.render(), "2024-01-15T15:30:00+00:00");

        assert!(cast_value(&Value::from("25:99"), &DataType::Time).is_none());
    }

    #[test]
    fn test_string_cast_renders_anything() {
        assert_eq!(
            cast_value(&Value::Int64(7), &DataType::String),
            Some(Value::from("7"))
        );
        assert_eq!(
            cast_value(&Value::Boolean(true), &DataType::String),
            Some(Value::from("true"))
        );
    }
}

//! Coercion of a column into its declared type.
//!
//! Values that cannot be cast keep their original representation and are
//! reported individually, so a partially coercible column still yields every
//! castable value in the target type.

use colguard_protocol::{cast_value, DataType, Value};

/// Result of coercing one column.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedColumn {
    pub values: Vec<Value>,
    /// `(row, original value)` for every cell that could not be cast
    pub failures: Vec<(usize, Value)>,
}

impl CoercedColumn {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Cast every cell of `values` into `target`.
pub fn coerce_column(values: &[Value], target: &DataType) -> CoercedColumn {
    let mut failures = Vec::new();
    let coerced = values
        .iter()
        .enumerate()
        .map(|(row, value)| match cast_value(value, target) {
            Some(cast) => cast,
            None => {
                failures.push((row, value.clone()));
                value.clone()
            }
        })
        .collect();
    CoercedColumn {
        values: coerced,
        failures,
    }
}

/// True when every non-null cell already has the declared type.
pub fn type_matches(values: &[Value], target: &DataType) -> bool {
    values.iter().all(|v| target.accepts(v))
}

/// Distinct non-null runtime types in the column, in order of first
/// appearance (e.g. `"string, int64"`).
pub fn observed_types(values: &[Value]) -> String {
    let mut seen: Vec<&'static str> = Vec::new();
    for value in values.iter().filter(|v| !v.is_null()) {
        let name = value.type_name();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    if seen.is_empty() {
        "null".to_string()
    } else {
        seen.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_coercion_keeps_originals() {
        let values = vec![
            Value::from("1.5"),
            Value::from("abc"),
            Value::Null,
            Value::Int64(2),
        ];
        let coerced = coerce_column(&values, &DataType::Float64);
        assert_eq!(
            coerced.values,
            vec![
                Value::Float64(1.5),
                Value::from("abc"),
                Value::Null,
                Value::Float64(2.0)
            ]
        );
        assert_eq!(coerced.failures, vec![(1, Value::from("abc"))]);
    }

    #[test]
    fn test_coercion_is_idempotent() {
        let values = vec![Value::from("2024-01-15"), Value::from("01/16/2024")];
        let once = coerce_column(&values, &DataType::Date);
        assert!(once.is_clean());
        let twice = coerce_column(&once.values, &DataType::Date);
        assert!(twice.is_clean());
        assert_eq!(twice.values, once.values);
    }

    #[test]
    fn test_type_matches_ignores_nulls() {
        assert!(type_matches(
            &[Value::Int64(1), Value::Null, Value::Float64(f64::NAN)],
            &DataType::Int64
        ));
        assert!(!type_matches(
            &[Value::Int64(1), Value::from("2")],
            &DataType::Int64
        ));
        assert_eq!(
            observed_types(&[Value::from("a"), Value::Int64(1), Value::from("b")]),
            "string, int64"
        );
        assert_eq!(observed_types(&[Value::Null]), "null");
    }
}

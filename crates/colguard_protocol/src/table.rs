//! Columnar tables.

use serde_json::Map;
use std::collections::HashSet;
use thiserror::Error;

use crate::value::Value;

/// Errors raised while building or reshaping a [`Table`].
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("cannot append rows: {0}")]
    IncompatibleAppend(String),

    #[error("record at row {0} is not a JSON object")]
    NotAnObject(usize),

    #[error("unsupported arrow type for column '{column}': {data_type}")]
    UnsupportedArrowType { column: String, data_type: String },

    #[error("arrow error: {0}")]
    Arrow(String),
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build a column from anything convertible into cells.
    pub fn from_values<T: Into<Value>>(name: impl Into<String>, values: Vec<T>) -> Self {
        Self::new(name, values.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

/// An ordered set of uniquely named, equal-length columns.
///
/// Rows are addressed positionally (`0..num_rows`); that position is the row
/// index reported in failure cases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Build a table, checking name uniqueness and equal column lengths.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
            if column.len() != num_rows {
                return Err(TableError::LengthMismatch {
                    column: column.name.clone(),
                    expected: num_rows,
                    actual: column.len(),
                });
            }
        }
        Ok(Self { columns, num_rows })
    }

    /// An empty table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A table with rows but no columns.
    pub fn with_row_count(num_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            num_rows,
        }
    }

    /// Build a table from row records (JSON objects).
    ///
    /// Column order follows first appearance across the records. Keys missing
    /// from a record are padded with `Null` so every column has one value per
    /// row.
    pub fn from_records(records: &[serde_json::Value]) -> Result<Self, TableError> {
        let mut names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (row, record) in records.iter().enumerate() {
            let obj = record.as_object().ok_or(TableError::NotAnObject(row))?;
            for key in obj.keys() {
                if seen.insert(key.clone()) {
                    names.push(key.clone());
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let values = records
                    .iter()
                    .map(|record| {
                        record
                            .get(&name)
                            .map(Value::from_json)
                            .unwrap_or(Value::Null)
                    })
                    .collect();
                Column::new(name, values)
            })
            .collect();

        let mut table = Self::new(columns)?;
        table.num_rows = records.len();
        Ok(table)
    }

    /// Render the table back into row records.
    pub fn to_records(&self) -> Vec<serde_json::Value> {
        (0..self.num_rows)
            .map(|row| {
                let mut obj = Map::with_capacity(self.columns.len());
                for column in &self.columns {
                    obj.insert(column.name.clone(), column.values[row].to_json());
                }
                serde_json::Value::Object(obj)
            })
            .collect()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_position(name).is_some()
    }

    /// Assign a column: replaces an existing column of the same name in place,
    /// otherwise appends it.
    pub fn with_column(mut self, column: Column) -> Result<Self, TableError> {
        if !self.columns.is_empty() && column.len() != self.num_rows {
            return Err(TableError::LengthMismatch {
                column: column.name.clone(),
                expected: self.num_rows,
                actual: column.len(),
            });
        }
        if self.columns.is_empty() {
            self.num_rows = column.len();
        }
        match self.column_position(&column.name) {
            Some(idx) => self.columns[idx] = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }

    /// Swap the values of an existing column, keeping its position.
    pub fn replace_values(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.num_rows {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.num_rows,
                actual: values.len(),
            });
        }
        if let Some(idx) = self.column_position(name) {
            self.columns[idx].values = values;
        }
        Ok(())
    }

    /// Append the rows of `other`, matching columns by name.
    ///
    /// Both tables must have the same column names in the same order.
    pub fn append(&mut self, other: Table) -> Result<(), TableError> {
        if self.columns.is_empty() && self.num_rows == 0 {
            *self = other;
            return Ok(());
        }
        let mine: Vec<&str> = self.column_names();
        let theirs: Vec<&str> = other.column_names();
        if mine != theirs {
            return Err(TableError::IncompatibleAppend(format!(
                "expected columns [{}], got [{}]",
                mine.join(", "),
                theirs.join(", ")
            )));
        }
        let added = other.num_rows;
        for (mine, theirs) in self.columns.iter_mut().zip(other.columns) {
            mine.values.extend(theirs.values);
        }
        self.num_rows += added;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_records_pads_missing_keys() {
        let rows = vec![json!({"a": 1, "b": "x"}), json!({"a": 2}), json!({"c": true})];
        let table = Table::from_records(&rows).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert_eq!(table.column("b").unwrap().values[1], Value::Null);
        assert_eq!(table.column("c").unwrap().values[2], Value::Boolean(true));
    }

    #[test]
    fn test_from_records_rejects_non_objects() {
        let rows = vec![json!({"a": 1}), json!(5)];
        assert_eq!(
            Table::from_records(&rows).unwrap_err(),
            TableError::NotAnObject(1)
        );
    }

    #[test]
    fn test_new_rejects_duplicates_and_ragged_columns() {
        let dup = Table::new(vec![
            Column::from_values("a", vec![1i64]),
            Column::from_values("a", vec![2i64]),
        ]);
        assert!(matches!(dup, Err(TableError::DuplicateColumn(_))));

        let ragged = Table::new(vec![
            Column::from_values("a", vec![1i64, 2]),
            Column::from_values("b", vec![1i64]),
        ]);
        assert!(matches!(ragged, Err(TableError::LengthMismatch { .. })));
    }

    #[test]
    fn test_with_column_replaces_in_place() {
        let table = Table::new(vec![
            Column::from_values("a", vec![1i64, 2]),
            Column::from_values("b", vec!["x", "y"]),
        ])
        .unwrap();
        let table = table
            .with_column(Column::from_values("a", vec![10i64, 20]))
            .unwrap()
            .with_column(Column::from_values("c", vec![true, false]))
            .unwrap();
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert_eq!(table.column("a").unwrap().values[0], Value::Int64(10));
    }

    #[test]
    fn test_append_and_records_round_trip() {
        let mut table = Table::from_records(&[json!({"a": 1})]).unwrap();
        table
            .append(Table::from_records(&[json!({"a": 2})]).unwrap())
            .unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.to_records(), vec![json!({"a": 1}), json!({"a": 2})]);
    }
}

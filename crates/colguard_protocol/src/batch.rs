//! Arrow `RecordBatch` interop.
//!
//! Arrow arrays are normalized to a small set of physical types with
//! `arrow::compute::cast` before being read cell by cell, so every integer
//! width lands in `Int64`, every timestamp unit in microseconds, and so on.

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryBuilder, BooleanBuilder, Date32Builder, Float64Builder,
    Int64Builder, NullArray, StringBuilder, Time64MicrosecondBuilder,
    TimestampMicrosecondBuilder,
};
use arrow::compute::{cast, cast_with_options, CastOptions};
use arrow::datatypes::{
    DataType as ArrowDataType, Date32Type, Field, Float64Type, Int64Type, Schema,
    Time64MicrosecondType, TimeUnit, TimestampMicrosecondType,
};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::table::{Column, Table, TableError};
use crate::value::Value;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

impl From<ArrowError> for TableError {
    fn from(err: ArrowError) -> Self {
        TableError::Arrow(err.to_string())
    }
}

impl TryFrom<&RecordBatch> for Table {
    type Error = TableError;

    fn try_from(batch: &RecordBatch) -> Result<Self, Self::Error> {
        let schema = batch.schema();
        let mut columns = Vec::with_capacity(batch.num_columns());
        for (field, array) in schema.fields().iter().zip(batch.columns()) {
            columns.push(Column::new(
                field.name().clone(),
                array_to_values(field.name(), array)?,
            ));
        }
        if columns.is_empty() {
            return Ok(Table::with_row_count(batch.num_rows()));
        }
        Table::new(columns)
    }
}

impl Table {
    /// Convert the table into a `RecordBatch`.
    ///
    /// Each column gets the Arrow type of its non-null values. Columns mixing
    /// integers and floats become `Float64`; any other mix falls back to
    /// `Utf8` text.
    pub fn to_record_batch(&self) -> Result<RecordBatch, TableError> {
        let mut fields = Vec::with_capacity(self.num_columns());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.num_columns());
        for column in self.columns() {
            let array = values_to_array(&column.values);
            fields.push(Field::new(
                column.name.clone(),
                array.data_type().clone(),
                true,
            ));
            arrays.push(array);
        }
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &options,
        )?)
    }
}

fn strict_cast(array: &ArrayRef, to: &ArrowDataType) -> Result<ArrayRef, TableError> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(cast_with_options(array, to, &options)?)
}

fn collect_values(array: &dyn Array, read: impl Fn(usize) -> Value) -> Vec<Value> {
    (0..array.len())
        .map(|row| {
            if array.is_null(row) {
                Value::Null
            } else {
                read(row)
            }
        })
        .collect()
}

fn array_to_values(name: &str, array: &ArrayRef) -> Result<Vec<Value>, TableError> {
    use ArrowDataType as A;

    let values = match array.data_type() {
        A::Null => vec![Value::Null; array.len()],
        A::Boolean => {
            let arr = array.as_boolean();
            collect_values(arr, |row| Value::Boolean(arr.value(row)))
        }
        A::Int8 | A::Int16 | A::Int32 | A::Int64 | A::UInt8 | A::UInt16 | A::UInt32
        | A::UInt64 => {
            let casted = strict_cast(array, &A::Int64)?;
            let arr = casted.as_primitive::<Int64Type>();
            collect_values(arr, |row| Value::Int64(arr.value(row)))
        }
        A::Float16 | A::Float32 | A::Float64 => {
            let casted = cast(array, &A::Float64)?;
            let arr = casted.as_primitive::<Float64Type>();
            collect_values(arr, |row| Value::Float64(arr.value(row)))
        }
        A::Utf8 => {
            let arr = array.as_string::<i32>();
            collect_values(arr, |row| Value::String(arr.value(row).to_string()))
        }
        A::LargeUtf8 => {
            let arr = array.as_string::<i64>();
            collect_values(arr, |row| Value::String(arr.value(row).to_string()))
        }
        A::Utf8View => {
            let casted = cast(array, &A::Utf8)?;
            let arr = casted.as_string::<i32>();
            collect_values(arr, |row| Value::String(arr.value(row).to_string()))
        }
        A::Date32 | A::Date64 => {
            let casted = cast(array, &A::Date32)?;
            let arr = casted.as_primitive::<Date32Type>();
            collect_values(arr, |row| {
                arr.value(row)
                    .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .map(Value::Date)
                    .unwrap_or(Value::Null)
            })
        }
        A::Timestamp(_, tz) => {
            let target = A::Timestamp(TimeUnit::Microsecond, tz.clone());
            let casted = cast(array, &target)?;
            let arr = casted.as_primitive::<TimestampMicrosecondType>();
            let aware = tz.is_some();
            collect_values(arr, |row| match DateTime::from_timestamp_micros(arr.value(row)) {
                Some(instant) if aware => Value::TimestampTz(instant),
                Some(instant) => Value::Timestamp(instant.naive_utc()),
                None => Value::Null,
            })
        }
        A::Time32(_) | A::Time64(_) => {
            let casted = cast(array, &A::Time64(TimeUnit::Microsecond))?;
            let arr = casted.as_primitive::<Time64MicrosecondType>();
            collect_values(arr, |row| {
                let micros = arr.value(row);
                NaiveTime::from_num_seconds_from_midnight_opt(
                    (micros / 1_000_000) as u32,
                    ((micros % 1_000_000) * 1_000) as u32,
                )
                .map(Value::Time)
                .unwrap_or(Value::Null)
            })
        }
        A::Binary => {
            let arr = array.as_binary::<i32>();
            collect_values(arr, |row| Value::Binary(arr.value(row).to_vec()))
        }
        A::LargeBinary => {
            let arr = array.as_binary::<i64>();
            collect_values(arr, |row| Value::Binary(arr.value(row).to_vec()))
        }
        other => {
            return Err(TableError::UnsupportedArrowType {
                column: name.to_string(),
                data_type: other.to_string(),
            })
        }
    };
    Ok(values)
}

fn values_to_array(values: &[Value]) -> ArrayRef {
    let kinds: BTreeSet<&'static str> = values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| v.type_name())
        .collect();

    let kind = match kinds.len() {
        0 => return Arc::new(NullArray::new(values.len())),
        1 => kinds.iter().next().copied().unwrap_or("string"),
        2 if kinds.contains("int64") && kinds.contains("float64") => "float64",
        _ => "string",
    };

    match kind {
        "boolean" => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Boolean(b) => builder.append_value(*b),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        "int64" => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Int64(i) => builder.append_value(*i),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        "float64" => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                match value.as_f64() {
                    Some(f) => builder.append_value(f),
                    None => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        "date" => {
            let mut builder = Date32Builder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Date(d) => {
                        builder.append_value(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                    }
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        "timestamp" => {
            let mut builder = TimestampMicrosecondBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Timestamp(ts) => {
                        builder.append_value(ts.and_utc().timestamp_micros())
                    }
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        "timestamp_tz" => {
            let mut builder =
                TimestampMicrosecondBuilder::with_capacity(values.len()).with_timezone("UTC");
            for value in values {
                match value {
                    Value::TimestampTz(ts) => builder.append_value(ts.timestamp_micros()),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        "time" => {
            let mut builder = Time64MicrosecondBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Time(t) => builder.append_value(
                        t.num_seconds_from_midnight() as i64 * 1_000_000
                            + (t.nanosecond() / 1_000) as i64,
                    ),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        "binary" => {
            let mut builder = BinaryBuilder::new();
            for value in values {
                match value {
                    Value::Binary(bytes) => builder.append_value(bytes),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::new();
            for value in values {
                if value.is_null() {
                    builder.append_null();
                } else {
                    builder.append_value(value.render());
                }
            }
            Arc::new(builder.finish())
        }
    }
}

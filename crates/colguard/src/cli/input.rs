//! Reading data files into tables and writing validated tables back out.
//!
//! Supported inputs:
//! - CSV: every cell is read as text, empty cells become null
//! - JSON: an array of records
//! - JSONL/NDJSON: one record per line
//! - Parquet: Arrow batches, concatenated

use crate::cli::error::HelpfulError;
use anyhow::{Context, Result};
use colguard_protocol::{Column, Table, Value};
use csv::ReaderBuilder;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::errors::ParquetError;
use serde_json::Value as JsonValue;
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

/// Data file formats, detected by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
    JsonLines,
    Parquet,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(DataFormat::Csv),
            "json" => Some(DataFormat::Json),
            "jsonl" | "ndjson" => Some(DataFormat::JsonLines),
            "parquet" | "pq" => Some(DataFormat::Parquet),
            _ => None,
        }
    }
}

/// Load a data file as a table.
pub fn read_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(HelpfulError::file_not_found(path).into());
    }
    let format =
        DataFormat::from_path(path).ok_or_else(|| HelpfulError::unsupported_data_format(path))?;

    let table = match format {
        DataFormat::Csv => read_csv(path)?,
        DataFormat::Json => read_json(path)?,
        DataFormat::JsonLines => read_json_lines(path)?,
        DataFormat::Parquet => read_parquet(path)?,
    };
    debug!(
        path = %path.display(),
        ?format,
        rows = table.num_rows(),
        columns = table.num_columns(),
        "Loaded data file"
    );
    Ok(table)
}

fn read_csv(path: &Path) -> Result<Table> {
    let file =
        File::open(path).map_err(|e| HelpfulError::cannot_read_file(path, &e.to_string()))?;
    let mut reader = ReaderBuilder::new().from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e: csv::Error| HelpfulError::csv_parse_error(path, 1, &e.to_string()))?
        .iter()
        .map(|s: &str| s.to_string())
        .collect();

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for (idx, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e: csv::Error| HelpfulError::csv_parse_error(path, idx + 2, &e.to_string()))?;
        for (values, cell) in columns.iter_mut().zip(record.iter()) {
            values.push(if cell.is_empty() {
                Value::Null
            } else {
                Value::from(cell)
            });
        }
    }

    Table::new(
        headers
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect(),
    )
    .with_context(|| format!("Failed to build table from {}", path.display()))
}

fn read_json(path: &Path) -> Result<Table> {
    let content =
        fs::read_to_string(path).map_err(|e| HelpfulError::cannot_read_file(path, &e.to_string()))?;
    let value: JsonValue = serde_json::from_str(&content)
        .map_err(|e| HelpfulError::json_parse_error(path, &e.to_string()))?;
    let records = match value {
        JsonValue::Array(records) => records,
        _ => {
            return Err(
                HelpfulError::json_parse_error(path, "Expected an array of records at root").into(),
            )
        }
    };
    Table::from_records(&records)
        .map_err(|e| HelpfulError::json_parse_error(path, &e.to_string()).into())
}

fn read_json_lines(path: &Path) -> Result<Table> {
    let content =
        fs::read_to_string(path).map_err(|e| HelpfulError::cannot_read_file(path, &e.to_string()))?;
    let records = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<JsonValue>(line).map_err(|e| {
                HelpfulError::json_parse_error(path, &format!("line {}: {}", idx + 1, e))
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Table::from_records(&records)
        .map_err(|e| HelpfulError::json_parse_error(path, &e.to_string()).into())
}

fn read_parquet(path: &Path) -> Result<Table> {
    let file =
        File::open(path).map_err(|e| HelpfulError::cannot_read_file(path, &e.to_string()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e: ParquetError| HelpfulError::parquet_error(path, &e.to_string()))?;
    let arrow_schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e: ParquetError| HelpfulError::parquet_error(path, &e.to_string()))?;

    // Keep the column layout even when the file has no rows.
    let mut table = Table::new(
        arrow_schema
            .fields()
            .iter()
            .map(|f| Column::new(f.name().as_str(), Vec::new()))
            .collect(),
    )?;
    for batch in reader {
        let batch = batch.map_err(|e| HelpfulError::parquet_error(path, &e.to_string()))?;
        let chunk = Table::try_from(&batch)
            .with_context(|| format!("Unsupported column type in {}", path.display()))?;
        table.append(chunk)?;
    }
    Ok(table)
}

/// Write a table to `.parquet` or `.json`.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    match DataFormat::from_path(path) {
        Some(DataFormat::Parquet) => {
            let batch = table
                .to_record_batch()
                .context("Failed to convert table to Arrow")?;
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
        }
        Some(DataFormat::Json) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(file, &table.to_records())?;
        }
        _ => return Err(HelpfulError::unsupported_output_format(path).into()),
    }
    debug!(path = %path.display(), rows = table.num_rows(), "Wrote validated table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_cells_are_text_and_empty_is_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "item,price\napple,0.5\n,1\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.column_names(), vec!["item", "price"]);
        assert_eq!(
            table.column("item").unwrap().values,
            vec![Value::from("apple"), Value::Null]
        );
        assert_eq!(table.column("price").unwrap().values[0], Value::from("0.5"));
    }

    #[test]
    fn test_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        fs::write(&path, "{\"a\": 1}\n\n{\"a\": 2, \"b\": \"x\"}\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("b").unwrap().values[0], Value::Null);
    }

    #[test]
    fn test_parquet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let table = Table::new(vec![
            Column::from_values("id", vec![1i64, 2, 3]),
            Column::from_values("name", vec!["a", "b", "c"]),
        ])
        .unwrap();

        write_table(&table, &path).unwrap();
        assert_eq!(read_table(&path).unwrap(), table);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        fs::write(&path, "").unwrap();
        let err = read_table(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported data format"));
    }
}

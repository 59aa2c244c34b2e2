//! Helpful error types for CLI commands
//!
//! Every error says what went wrong, where, and what to try next.

use std::fmt;
use std::path::Path;

/// An error with context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    // === Common error constructors ===

    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified file does not exist")
            .with_suggestion(format!("TRY: Check the path: ls -la {}", path.display()))
    }

    pub fn unsupported_data_format(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(no extension)");
        Self::new(format!("Unsupported data format: {}", ext))
            .with_context(format!("Cannot read table from {}", path.display()))
            .with_suggestion("TRY: Supported types: csv, json, jsonl, ndjson, parquet")
    }

    pub fn unsupported_output_format(path: &Path) -> Self {
        Self::new(format!("Unsupported output format: {}", path.display()))
            .with_suggestion("TRY: Use a .parquet or .json output path")
    }

    pub fn cannot_read_file(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot read file: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestion("TRY: Check file permissions")
    }

    pub fn csv_parse_error(path: &Path, line: usize, details: &str) -> Self {
        Self::new(format!("CSV parse error at line {}", line))
            .with_context(format!("{}: {}", path.display(), details))
            .with_suggestion("TRY: Check that every row has the same number of fields")
    }

    pub fn json_parse_error(path: &Path, details: &str) -> Self {
        Self::new(format!("Invalid JSON data: {}", path.display()))
            .with_context(details.to_string())
            .with_suggestion("TRY: .json files hold an array of records, .jsonl one record per line")
    }

    pub fn parquet_error(path: &Path, details: &str) -> Self {
        Self::new(format!("Cannot read Parquet file: {}", path.display()))
            .with_context(details.to_string())
            .with_suggestion("TRY: Verify the file is a valid Parquet file")
    }

    pub fn invalid_schema(path: &Path, details: &str) -> Self {
        Self::new(format!("Invalid schema: {}", path.display()))
            .with_context(details.to_string())
            .with_suggestion(format!(
                "TRY: Inspect the declaration: colguard schema show {}",
                path.display()
            ))
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;
        if let Some(context) = &self.context {
            writeln!(f, "  {}", context)?;
        }
        for suggestion in &self.suggestions {
            writeln!(f, "  {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

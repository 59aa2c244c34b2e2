//! Failure cases and validation reports.
//!
//! A [`ValidationReport`] is the frozen output of one validation pass: an
//! ordered list of [`FailureCase`]s plus the mode that produced it. Its row
//! shape (`schema`, `column`, `check`, `check_value`, `row_index`,
//! `failure_case`, `check_number`, `site`) is stable for downstream tooling.

use std::fmt;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType as ArrowDataType, Field, Schema as ArrowSchema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use colguard_protocol::Value;
use serde::{Deserialize, Serialize, Serializer};

// ============================================================================
// Modes
// ============================================================================

/// Fail-fast or exhaustive validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Stop at the first failure
    Eager,
    /// Evaluate everything and report every failure
    #[default]
    Lazy,
}

impl ValidationMode {
    pub fn from_lazy(lazy: bool) -> Self {
        if lazy {
            ValidationMode::Lazy
        } else {
            ValidationMode::Eager
        }
    }

    pub fn is_lazy(self) -> bool {
        self == ValidationMode::Lazy
    }

    pub fn completeness(self) -> Completeness {
        match self {
            ValidationMode::Eager => Completeness::FirstOnly,
            ValidationMode::Lazy => Completeness::Complete,
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationMode::Eager => f.write_str("eager"),
            ValidationMode::Lazy => f.write_str("lazy"),
        }
    }
}

/// Whether a report holds every failure or only the first one found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    FirstOnly,
    Complete,
}

// ============================================================================
// Failure cases
// ============================================================================

/// Where a failure was observed when validating around a function call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoundarySite {
    Input(String),
    Output,
}

impl fmt::Display for BoundarySite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundarySite::Input(param) => write!(f, "input:{}", param),
            BoundarySite::Output => f.write_str("output"),
        }
    }
}

impl Serialize for BoundarySite {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One recorded violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureCase {
    pub schema: String,
    /// Absent for table-wide failures
    pub column: Option<String>,
    pub check: String,
    /// Check parameters, rendered as text
    pub check_value: Option<String>,
    /// Absent for whole-column failures
    pub row_index: Option<usize>,
    /// The offending value, or a description of what is missing
    pub failure_case: Value,
    /// Position of the check in its column's declared list
    pub check_number: Option<usize>,
    pub site: Option<BoundarySite>,
}

impl FailureCase {
    pub fn new(schema: impl Into<String>, check: impl Into<String>, failure_case: Value) -> Self {
        Self {
            schema: schema.into(),
            column: None,
            check: check.into(),
            check_value: None,
            row_index: None,
            failure_case,
            check_number: None,
            site: None,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn check_value(mut self, check_value: Option<String>) -> Self {
        self.check_value = check_value;
        self
    }

    pub fn row(mut self, row_index: usize) -> Self {
        self.row_index = Some(row_index);
        self
    }

    pub fn check_number(mut self, check_number: usize) -> Self {
        self.check_number = Some(check_number);
        self
    }

    pub fn with_site(mut self, site: BoundarySite) -> Self {
        self.site = Some(site);
        self
    }

    /// The `failure_case` field as text, `None` for a null value.
    fn failure_text(&self) -> Option<String> {
        match &self.failure_case {
            Value::Null => None,
            other => Some(other.render()),
        }
    }
}

impl fmt::Display for FailureCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(site) = &self.site {
            write!(f, "[{}] ", site)?;
        }
        write!(f, "{}", self.schema)?;
        if let Some(column) = &self.column {
            write!(f, ".{}", column)?;
        }
        write!(f, ": check '{}'", self.check)?;
        if let Some(value) = &self.check_value {
            write!(f, " ({})", value)?;
        }
        match self.row_index {
            Some(row) => write!(f, " failed at row {}: {}", row, self.failure_case),
            None => write!(f, " failed: {}", self.failure_case),
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Failures per `(column, check)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub column: Option<String>,
    pub check: String,
    pub failures: usize,
}

/// Immutable result of one validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    mode: ValidationMode,
    failures: Vec<FailureCase>,
}

impl ValidationReport {
    pub fn new(mode: ValidationMode, failures: Vec<FailureCase>) -> Self {
        Self { mode, failures }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn completeness(&self) -> Completeness {
        self.mode.completeness()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failure_cases(&self) -> &[FailureCase] {
        &self.failures
    }

    pub fn into_failure_cases(self) -> Vec<FailureCase> {
        self.failures
    }

    pub fn first(&self) -> Option<&FailureCase> {
        self.failures.first()
    }

    /// Failures grouped by column, in order of first appearance.
    /// Table-wide failures are grouped under `None`.
    pub fn by_column(&self) -> Vec<(Option<&str>, Vec<&FailureCase>)> {
        let mut groups: Vec<(Option<&str>, Vec<&FailureCase>)> = Vec::new();
        for case in &self.failures {
            let key = case.column.as_deref();
            match groups.iter_mut().find(|(column, _)| *column == key) {
                Some((_, cases)) => cases.push(case),
                None => groups.push((key, vec![case])),
            }
        }
        groups
    }

    pub fn for_column(&self, column: &str) -> Vec<&FailureCase> {
        self.failures
            .iter()
            .filter(|c| c.column.as_deref() == Some(column))
            .collect()
    }

    pub fn for_check(&self, check: &str) -> Vec<&FailureCase> {
        self.failures.iter().filter(|c| c.check == check).collect()
    }

    /// Failure counts per `(column, check)`, in order of first appearance.
    pub fn summary(&self) -> Vec<SummaryRow> {
        let mut rows: Vec<SummaryRow> = Vec::new();
        for case in &self.failures {
            match rows
                .iter_mut()
                .find(|r| r.column == case.column && r.check == case.check)
            {
                Some(row) => row.failures += 1,
                None => rows.push(SummaryRow {
                    column: case.column.clone(),
                    check: case.check.clone(),
                    failures: 1,
                }),
            }
        }
        rows
    }

    /// Tag every failure with the boundary site it was observed at.
    pub fn with_site(self, site: BoundarySite) -> Self {
        Self {
            mode: self.mode,
            failures: self
                .failures
                .into_iter()
                .map(|c| c.with_site(site.clone()))
                .collect(),
        }
    }

    /// Concatenate reports in the order given.
    pub fn concat(
        mode: ValidationMode,
        reports: impl IntoIterator<Item = ValidationReport>,
    ) -> Self {
        Self {
            mode,
            failures: reports
                .into_iter()
                .flat_map(ValidationReport::into_failure_cases)
                .collect(),
        }
    }

    /// One JSON object per failure case.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.failures
                .iter()
                .map(|case| {
                    serde_json::json!({
                        "schema": case.schema,
                        "column": case.column,
                        "check": case.check,
                        "check_value": case.check_value,
                        "row_index": case.row_index,
                        "failure_case": case.failure_case.to_json(),
                        "check_number": case.check_number,
                        "site": case.site.as_ref().map(|s| s.to_string()),
                    })
                })
                .collect(),
        )
    }

    /// Arrow form of the report. `failure_case` is rendered as text.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("schema", ArrowDataType::Utf8, false),
            Field::new("column", ArrowDataType::Utf8, true),
            Field::new("check", ArrowDataType::Utf8, false),
            Field::new("check_value", ArrowDataType::Utf8, true),
            Field::new("row_index", ArrowDataType::UInt64, true),
            Field::new("failure_case", ArrowDataType::Utf8, true),
            Field::new("check_number", ArrowDataType::UInt64, true),
            Field::new("site", ArrowDataType::Utf8, true),
        ]));

        let cases = &self.failures;
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                cases.iter().map(|c| c.schema.as_str()),
            )),
            Arc::new(StringArray::from(
                cases.iter().map(|c| c.column.clone()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from_iter_values(
                cases.iter().map(|c| c.check.as_str()),
            )),
            Arc::new(StringArray::from(
                cases.iter().map(|c| c.check_value.clone()).collect::<Vec<_>>(),
            )),
            Arc::new(UInt64Array::from(
                cases
                    .iter()
                    .map(|c| c.row_index.map(|r| r as u64))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                cases.iter().map(FailureCase::failure_text).collect::<Vec<_>>(),
            )),
            Arc::new(UInt64Array::from(
                cases
                    .iter()
                    .map(|c| c.check_number.map(|n| n as u64))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                cases
                    .iter()
                    .map(|c| c.site.as_ref().map(|s| s.to_string()))
                    .collect::<Vec<_>>(),
            )),
        ];
        RecordBatch::try_new(schema, columns)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.completeness() {
            Completeness::FirstOnly => "first failure only",
            Completeness::Complete => "complete",
        };
        write!(
            f,
            "{} failure case(s) ({} validation, {})",
            self.failures.len(),
            self.mode,
            scope
        )?;
        for (column, cases) in self.by_column() {
            write!(f, "\n  {}:", column.unwrap_or("<table>"))?;
            for case in cases {
                write!(f, "\n    - {}", case)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn sample() -> ValidationReport {
        ValidationReport::new(
            ValidationMode::Lazy,
            vec![
                FailureCase::new("fruits", "isin", Value::from("applee"))
                    .column("item")
                    .check_value(Some("[apple, orange]".into()))
                    .row(0)
                    .check_number(0),
                FailureCase::new("fruits", "gt", Value::Int64(-1000))
                    .column("price")
                    .check_value(Some("0".into()))
                    .row(1)
                    .check_number(0),
                FailureCase::new("fruits", "isin", Value::from("pear"))
                    .column("item")
                    .row(2)
                    .check_number(0),
                FailureCase::new("fruits", "column_in_schema", Value::from("extra"))
                    .column("extra"),
            ],
        )
    }

    #[test]
    fn test_grouping_and_lookup() {
        let report = sample();
        let groups = report.by_column();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].0, Some("item"));
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(report.for_column("price").len(), 1);
        assert_eq!(report.for_check("isin").len(), 2);
        assert_eq!(report.completeness(), Completeness::Complete);
    }

    #[test]
    fn test_summary_counts() {
        let summary = sample().summary();
        assert_eq!(
            summary[0],
            SummaryRow {
                column: Some("item".into()),
                check: "isin".into(),
                failures: 2
            }
        );
        assert_eq!(summary.len(), 3);
    }

    #[test]
    fn test_json_rows_have_stable_shape() {
        let json = sample().to_json();
        let first = &json[0];
        assert_eq!(first["schema"], "fruits");
        assert_eq!(first["column"], "item");
        assert_eq!(first["check"], "isin");
        assert_eq!(first["check_value"], "[apple, orange]");
        assert_eq!(first["row_index"], 0);
        assert_eq!(first["failure_case"], "applee");
        assert!(first["site"].is_null());
        assert!(json[3]["row_index"].is_null());
    }

    #[test]
    fn test_record_batch() {
        let batch = sample()
            .with_site(BoundarySite::Input("df".into()))
            .to_record_batch()
            .unwrap();
        assert_eq!(batch.num_rows(), 4);
        assert_eq!(batch.num_columns(), 8);
        let site = batch
            .column(7)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(site.value(0), "input:df");
    }

    #[test]
    fn test_display_mentions_mode_and_rows() {
        let text = sample().to_string();
        assert!(text.starts_with("4 failure case(s) (lazy validation, complete)"));
        assert!(
            text.contains("fruits.item: check 'isin' ([apple, orange]) failed at row 0: applee")
        );
        assert!(!text.contains("<table>"));
    }
}

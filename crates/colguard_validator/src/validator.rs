//! Validation of a table against a schema.
//!
//! # Evaluation order
//!
//! 1. `column_in_schema` for undeclared table columns (strict schemas)
//! 2. `column_ordered` for declared columns out of order (ordered schemas)
//! 3. Per declared column, in declared order: presence
//!    (`column_in_dataframe`), coercion (`coerce_dtype`) or type check
//!    (`dtype`), then the column's value checks
//! 4. `multiple_fields_uniqueness` for the schema's unique column set
//!
//! Eager mode stops at the first failure, so its single failure is always the
//! first failure a lazy run reports.

use std::collections::HashMap;

use colguard_protocol::{Table, Value};
use colguard_schema::{ColumnSpec, Schema};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregator::FailureCollector;
use crate::check_engine::run_checks;
use crate::coercion::{coerce_column, observed_types, type_matches};
use crate::report::{FailureCase, ValidationMode, ValidationReport};

pub const COLUMN_IN_SCHEMA: &str = "column_in_schema";
pub const COLUMN_ORDERED: &str = "column_ordered";
pub const COLUMN_IN_DATAFRAME: &str = "column_in_dataframe";
pub const COERCE_DTYPE: &str = "coerce_dtype";
pub const DTYPE: &str = "dtype";
pub const MULTIPLE_FIELDS_UNIQUENESS: &str = "multiple_fields_uniqueness";

// ============================================================================
// Errors
// ============================================================================

/// A table did not conform to its schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    /// Eager validation: the report holds exactly one failure
    #[error("schema validation failed: {0}")]
    Single(ValidationReport),
    /// Lazy validation: the report holds every failure
    #[error("schema validation failed: {0}")]
    Aggregated(ValidationReport),
}

impl ValidationFailure {
    fn from_report(report: ValidationReport) -> Self {
        match report.mode() {
            ValidationMode::Eager => ValidationFailure::Single(report),
            ValidationMode::Lazy => ValidationFailure::Aggregated(report),
        }
    }

    pub fn report(&self) -> &ValidationReport {
        match self {
            ValidationFailure::Single(report) | ValidationFailure::Aggregated(report) => report,
        }
    }

    pub fn into_report(self) -> ValidationReport {
        match self {
            ValidationFailure::Single(report) | ValidationFailure::Aggregated(report) => report,
        }
    }

    /// The (first) failure case.
    pub fn failure_case(&self) -> Option<&FailureCase> {
        self.report().first()
    }

    pub(crate) fn map_report(self, f: impl FnOnce(ValidationReport) -> ValidationReport) -> Self {
        match self {
            ValidationFailure::Single(report) => ValidationFailure::Single(f(report)),
            ValidationFailure::Aggregated(report) => ValidationFailure::Aggregated(f(report)),
        }
    }
}

// ============================================================================
// Validator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub mode: ValidationMode,
    /// Worker threads for column-parallel lazy validation
    pub threads: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Lazy,
            threads: 1,
        }
    }
}

/// Validates tables against schemas. Stateless; one instance can serve any
/// number of concurrent calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

/// Per-column outcome: coerced values to substitute, if any.
type Replacements = Vec<(String, Vec<Value>)>;

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn eager() -> Self {
        Self::new(ValidatorConfig {
            mode: ValidationMode::Eager,
            ..ValidatorConfig::default()
        })
    }

    pub fn lazy() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.threads = threads.max(1);
        self
    }

    pub fn config(&self) -> ValidatorConfig {
        self.config
    }

    pub fn mode(&self) -> ValidationMode {
        self.config.mode
    }

    /// Validate `table` against `schema`.
    ///
    /// Returns the table with coerced columns substituted in place; columns
    /// the schema does not mention pass through unchanged.
    pub fn validate(&self, schema: &Schema, table: &Table) -> Result<Table, ValidationFailure> {
        let mode = self.config.mode;
        let mut collector = FailureCollector::new(mode);

        check_strict(schema, table, &mut collector);
        check_ordered(schema, table, &mut collector);

        let replacements = if self.parallel(schema) {
            self.validate_columns_parallel(schema, table, &mut collector)
        } else {
            validate_columns(schema, schema.columns(), table, &mut collector)
        };

        let mut output = table.clone();
        substitute(schema, &mut output, replacements, &mut collector);

        if !collector.is_done() {
            check_multiple_fields_unique(schema, &output, &mut collector);
        }

        let report = collector.freeze();
        info!(
            schema = schema.name(),
            mode = %mode,
            rows = table.num_rows(),
            failures = report.len(),
            "Validation finished"
        );
        if report.is_empty() {
            Ok(output)
        } else {
            Err(ValidationFailure::from_report(report))
        }
    }

    fn parallel(&self, schema: &Schema) -> bool {
        self.config.mode.is_lazy() && self.config.threads > 1 && schema.len() > 1
    }

    /// Split declared columns into contiguous chunks, one scoped worker per
    /// chunk, and merge in declared order.
    fn validate_columns_parallel(
        &self,
        schema: &Schema,
        table: &Table,
        collector: &mut FailureCollector,
    ) -> Replacements {
        let columns = schema.columns();
        let chunk_size = columns.len().div_ceil(self.config.threads);
        debug!(
            schema = schema.name(),
            workers = columns.len().div_ceil(chunk_size),
            "Validating columns in parallel"
        );

        let results: Vec<(FailureCollector, Replacements)> = std::thread::scope(|scope| {
            let handles: Vec<_> = columns
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        let mut local = FailureCollector::new(self.config.mode);
                        let replaced = validate_columns(schema, chunk, table, &mut local);
                        (local, replaced)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let mut replacements = Vec::new();
        for (local, replaced) in results {
            collector.absorb(local);
            replacements.extend(replaced);
        }
        replacements
    }
}

/// Validate `table` against `schema` in the given mode.
pub fn validate(schema: &Schema, table: &Table, lazy: bool) -> Result<Table, ValidationFailure> {
    Validator::new(ValidatorConfig {
        mode: ValidationMode::from_lazy(lazy),
        threads: 1,
    })
    .validate(schema, table)
}

/// Validation as a method on schemas.
pub trait Validate {
    fn validate(&self, table: &Table, mode: ValidationMode) -> Result<Table, ValidationFailure>;
}

impl Validate for Schema {
    fn validate(&self, table: &Table, mode: ValidationMode) -> Result<Table, ValidationFailure> {
        Validator::new(ValidatorConfig { mode, threads: 1 }).validate(self, table)
    }
}

// ============================================================================
// Table-level checks
// ============================================================================

fn check_strict(schema: &Schema, table: &Table, collector: &mut FailureCollector) {
    if !schema.strict() {
        return;
    }
    for name in table.column_names() {
        if !schema.has_column(name) {
            collector.push(
                FailureCase::new(schema.name(), COLUMN_IN_SCHEMA, Value::from(name)).column(name),
            );
        }
    }
}

/// Declared columns present in the table must keep their declared relative order.
fn check_ordered(schema: &Schema, table: &Table, collector: &mut FailureCollector) {
    if !schema.ordered() {
        return;
    }
    let mut last_position = None;
    for spec in schema.columns() {
        let Some(position) = table.column_position(&spec.name) else {
            continue;
        };
        match last_position {
            Some(last) if position < last => {
                collector.push(
                    FailureCase::new(schema.name(), COLUMN_ORDERED, Value::from(spec.name.as_str()))
                        .column(&spec.name),
                );
            }
            _ => last_position = Some(position),
        }
    }
}

/// Swap coerced columns into `output`. A column that cannot be swapped in is
/// a whole-column coercion failure, so an uncoerced table is never returned
/// as valid.
fn substitute(
    schema: &Schema,
    output: &mut Table,
    replacements: Replacements,
    collector: &mut FailureCollector,
) {
    for (name, values) in replacements {
        if let Err(err) = output.replace_values(&name, values) {
            warn!(column = %name, error = %err, "Coerced column could not be substituted");
            collector.push(
                FailureCase::new(schema.name(), COERCE_DTYPE, Value::String(err.to_string()))
                    .column(&name),
            );
        }
    }
}

fn check_multiple_fields_unique(schema: &Schema, table: &Table, collector: &mut FailureCollector) {
    let names = schema.unique();
    if names.is_empty() {
        return;
    }
    let Some(columns) = names
        .iter()
        .map(|n| table.column(n))
        .collect::<Option<Vec<_>>>()
    else {
        // Missing columns were already reported by the presence check.
        return;
    };

    let keys: Vec<String> = (0..table.num_rows())
        .map(|row| {
            columns
                .iter()
                .map(|c| c.values[row].unique_key())
                .collect::<Vec<_>>()
                .join("\u{1f}")
        })
        .collect();
    let mut counts: HashMap<&str, usize> = HashMap::with_capacity(keys.len());
    for key in &keys {
        *counts.entry(key.as_str()).or_insert(0) += 1;
    }

    let check_value = format!("[{}]", names.join(", "));
    for (row, key) in keys.iter().enumerate() {
        if counts.get(key.as_str()).copied().unwrap_or(0) < 2 {
            continue;
        }
        if collector.is_done() {
            return;
        }
        let combination: serde_json::Map<String, serde_json::Value> = columns
            .iter()
            .map(|c| (c.name.clone(), c.values[row].to_json()))
            .collect();
        collector.push(
            FailureCase::new(
                schema.name(),
                MULTIPLE_FIELDS_UNIQUENESS,
                Value::String(serde_json::Value::Object(combination).to_string()),
            )
            .check_value(Some(check_value.clone()))
            .row(row),
        );
    }
}

// ============================================================================
// Column-level validation
// ============================================================================

fn validate_columns(
    schema: &Schema,
    specs: &[ColumnSpec],
    table: &Table,
    collector: &mut FailureCollector,
) -> Replacements {
    let mut replacements = Vec::new();
    for spec in specs {
        if collector.is_done() {
            break;
        }
        if let Some(values) = validate_column(schema, spec, table, collector) {
            replacements.push((spec.name.clone(), values));
        }
    }
    replacements
}

/// Validate one declared column. Returns the coerced values when coercion ran.
fn validate_column(
    schema: &Schema,
    spec: &ColumnSpec,
    table: &Table,
    collector: &mut FailureCollector,
) -> Option<Vec<Value>> {
    let Some(column) = table.column(&spec.name) else {
        if spec.required {
            collector.push(
                FailureCase::new(
                    schema.name(),
                    COLUMN_IN_DATAFRAME,
                    Value::from(spec.name.as_str()),
                )
                .column(&spec.name),
            );
        } else {
            debug!(column = %spec.name, "Optional column absent");
        }
        return None;
    };
    debug!(column = %spec.name, data_type = %spec.data_type, "Validating column");

    let dtype = Some(spec.data_type.to_string());
    let coerced = if spec.coerce || schema.coerce() {
        let coerced = coerce_column(&column.values, &spec.data_type);
        for (row, original) in coerced.failures {
            collector.push(
                FailureCase::new(schema.name(), COERCE_DTYPE, original)
                    .column(&spec.name)
                    .check_value(dtype.clone())
                    .row(row),
            );
        }
        Some(coerced.values)
    } else {
        if !type_matches(&column.values, &spec.data_type) {
            collector.push(
                FailureCase::new(
                    schema.name(),
                    DTYPE,
                    Value::String(observed_types(&column.values)),
                )
                .column(&spec.name)
                .check_value(dtype),
            );
        }
        None
    };

    if !collector.is_done() {
        let values = coerced.as_deref().unwrap_or(&column.values);
        run_checks(schema.name(), spec, values, collector);
    }
    coerced
}

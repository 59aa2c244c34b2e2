//! Validation around a function call.
//!
//! A [`Boundary`] holds the schemas for a function's named table arguments
//! and its returned table. Calling through it validates every declared
//! argument first (reporting all failing arguments together), runs the
//! function on the validated arguments, then validates the result.
//!
//! ```
//! use colguard_protocol::Table;
//! use colguard_schema::{ColumnSpec, Schema};
//! use colguard_validator::{Arguments, Boundary, ValidationMode};
//!
//! let input = Schema::declare("raw", Vec::<ColumnSpec>::new()).unwrap();
//! let boundary = Boundary::new(ValidationMode::Lazy).input("df", input);
//! let out = boundary
//!     .call(Arguments::new().with("df", Table::empty()), |mut args| {
//!         args.take("df").unwrap_or_else(Table::empty)
//!     })
//!     .unwrap();
//! assert_eq!(out.num_rows(), 0);
//! ```

use colguard_protocol::Table;
use colguard_schema::Schema;
use thiserror::Error;
use tracing::{debug, warn};

use crate::report::{BoundarySite, ValidationMode, ValidationReport};
use crate::validator::{ValidationFailure, Validator, ValidatorConfig};

/// Failure raised by a [`Boundary`].
#[derive(Debug, Error)]
pub enum BoundaryFailure {
    #[error("argument '{0}' has a schema but was not supplied")]
    MissingArgument(String),

    /// One or more arguments failed; the call was not made
    #[error("invalid input for {}: {report}", .parameters.join(", "))]
    Input {
        parameters: Vec<String>,
        report: ValidationReport,
    },

    /// The function ran but returned a table that does not conform
    #[error("invalid output: {0}")]
    Output(ValidationFailure),

    #[error("wrapped function failed: {0:#}")]
    Callee(anyhow::Error),
}

impl BoundaryFailure {
    /// The attached report, for input and output failures.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            BoundaryFailure::Input { report, .. } => Some(report),
            BoundaryFailure::Output(failure) => Some(failure.report()),
            BoundaryFailure::MissingArgument(_) | BoundaryFailure::Callee(_) => None,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            BoundaryFailure::Input { .. } | BoundaryFailure::MissingArgument(_)
        )
    }

    pub fn is_output(&self) -> bool {
        matches!(self, BoundaryFailure::Output(_))
    }
}

/// Ordered named table arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Table)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, table: Table) -> Self {
        self.insert(name, table);
        self
    }

    /// Set an argument, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = table,
            None => self.entries.push((name, table)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Remove and return an argument.
    pub fn take(&mut self, name: &str) -> Option<Table> {
        let position = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(position).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Input and output schemas for one function.
#[derive(Debug, Clone)]
pub struct Boundary {
    validator: Validator,
    inputs: Vec<(String, Schema)>,
    output: Option<Schema>,
}

impl Boundary {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            validator: Validator::new(ValidatorConfig {
                mode,
                ..ValidatorConfig::default()
            }),
            inputs: Vec::new(),
            output: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.validator = self.validator.with_threads(threads);
        self
    }

    /// Declare the schema of a named argument.
    pub fn input(mut self, parameter: impl Into<String>, schema: Schema) -> Self {
        let parameter = parameter.into();
        self.inputs.retain(|(p, _)| *p != parameter);
        self.inputs.push((parameter, schema));
        self
    }

    /// Declare the schema of the returned table.
    pub fn output(mut self, schema: Schema) -> Self {
        self.output = Some(schema);
        self
    }

    pub fn mode(&self) -> ValidationMode {
        self.validator.mode()
    }

    /// Validate every declared argument. Undeclared arguments pass through
    /// untouched; declared ones are replaced by their validated tables.
    pub fn validate_inputs(&self, mut args: Arguments) -> Result<Arguments, BoundaryFailure> {
        if let Some((missing, _)) = self.inputs.iter().find(|(p, _)| args.get(p).is_none()) {
            return Err(BoundaryFailure::MissingArgument(missing.clone()));
        }

        let mut parameters = Vec::new();
        let mut reports = Vec::new();
        for (parameter, schema) in &self.inputs {
            let Some(table) = args.get(parameter) else {
                continue;
            };
            match self.validator.validate(schema, table) {
                Ok(validated) => args.insert(parameter.clone(), validated),
                Err(failure) => {
                    debug!(
                        parameter = %parameter,
                        failures = failure.report().len(),
                        "Input failed validation"
                    );
                    parameters.push(parameter.clone());
                    reports.push(
                        failure
                            .into_report()
                            .with_site(BoundarySite::Input(parameter.clone())),
                    );
                }
            }
        }

        if reports.is_empty() {
            Ok(args)
        } else {
            warn!(parameters = ?parameters, "Rejected call with invalid input");
            Err(BoundaryFailure::Input {
                parameters,
                report: ValidationReport::concat(self.mode(), reports),
            })
        }
    }

    /// Validate a returned table against the output schema, if any.
    pub fn validate_output(&self, table: Table) -> Result<Table, BoundaryFailure> {
        let Some(schema) = &self.output else {
            return Ok(table);
        };
        self.validator.validate(schema, &table).map_err(|failure| {
            warn!(schema = schema.name(), "Function returned invalid output");
            BoundaryFailure::Output(
                failure.map_report(|report| report.with_site(BoundarySite::Output)),
            )
        })
    }

    /// Validate inputs, call `f`, validate its result.
    pub fn call<F>(&self, args: Arguments, f: F) -> Result<Table, BoundaryFailure>
    where
        F: FnOnce(Arguments) -> Table,
    {
        let args = self.validate_inputs(args)?;
        self.validate_output(f(args))
    }

    /// Like [`Boundary::call`] for fallible functions.
    pub fn try_call<F>(&self, args: Arguments, f: F) -> Result<Table, BoundaryFailure>
    where
        F: FnOnce(Arguments) -> anyhow::Result<Table>,
    {
        let args = self.validate_inputs(args)?;
        let table = f(args).map_err(BoundaryFailure::Callee)?;
        self.validate_output(table)
    }

    /// Bind `f` to this boundary, returning a reusable validated function.
    pub fn wrap<F>(self, f: F) -> impl Fn(Arguments) -> Result<Table, BoundaryFailure>
    where
        F: Fn(Arguments) -> Table,
    {
        move |args| self.call(args, &f)
    }
}

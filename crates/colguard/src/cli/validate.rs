//! Validate command - check a data file against a schema declaration

use crate::cli::input::{read_table, write_table};
use crate::cli::output::{plural, print_report};
use crate::cli::schema::load_schema;
use anyhow::Result;
use colguard_validator::{ValidationMode, ValidationReport, Validator, ValidatorConfig};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the validate command
#[derive(Debug)]
pub struct ValidateArgs {
    pub schema: PathBuf,
    pub data: PathBuf,
    pub eager: bool,
    pub threads: usize,
    pub json: bool,
    pub output: Option<PathBuf>,
}

/// Whether the data conformed; errors are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Invalid,
}

pub fn run(args: ValidateArgs) -> Result<Outcome> {
    let schema = load_schema(&args.schema)?;
    let table = read_table(&args.data)?;

    let mode = if args.eager {
        ValidationMode::Eager
    } else {
        ValidationMode::Lazy
    };
    let validator = Validator::new(ValidatorConfig {
        mode,
        threads: args.threads.max(1),
    });
    info!(
        schema = schema.name(),
        data = %args.data.display(),
        mode = %mode,
        threads = args.threads,
        "Validating data file"
    );

    match validator.validate(&schema, &table) {
        Ok(validated) => {
            if let Some(output) = &args.output {
                write_table(&validated, output)?;
            }
            if args.json {
                print_json_result(schema.name(), mode, table.num_rows(), None);
            } else {
                println!(
                    "OK: {} conforms to schema '{}' ({})",
                    args.data.display(),
                    schema.name(),
                    plural(table.num_rows(), "row")
                );
                if let Some(output) = &args.output {
                    println!("Wrote validated table to {}", output.display());
                }
            }
            Ok(Outcome::Valid)
        }
        Err(failure) => {
            let report = failure.report();
            if args.json {
                print_json_result(schema.name(), mode, table.num_rows(), Some(report));
            } else {
                println!(
                    "FAILED: {} does not conform to schema '{}': {} ({} validation)",
                    args.data.display(),
                    schema.name(),
                    plural(report.len(), "failure case"),
                    mode
                );
                print_report(report);
            }
            Ok(Outcome::Invalid)
        }
    }
}

fn print_json_result(
    schema: &str,
    mode: ValidationMode,
    rows: usize,
    report: Option<&ValidationReport>,
) {
    let output = json!({
        "valid": report.is_none(),
        "schema": schema,
        "mode": mode,
        "completeness": mode.completeness(),
        "rows": rows,
        "failure_count": report.map_or(0, ValidationReport::len),
        "summary": report.map(ValidationReport::summary).unwrap_or_default(),
        "failures": report.map(ValidationReport::to_json).unwrap_or_else(|| json!([])),
    });
    println!("{}", output);
}

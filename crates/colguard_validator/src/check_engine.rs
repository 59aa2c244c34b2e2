//! Evaluation of a column's value-level checks.
//!
//! Runs, in order: nullability (`not_nullable`), column uniqueness
//! (`field_uniqueness`), then every declared check. Each failing row becomes
//! one [`FailureCase`] carrying the row's value as seen by the checks.

use colguard_protocol::Value;
use colguard_schema::{Check, ColumnSpec};
use tracing::debug;

use crate::aggregator::FailureCollector;
use crate::report::FailureCase;

pub const NOT_NULLABLE: &str = "not_nullable";
pub const FIELD_UNIQUENESS: &str = "field_uniqueness";

/// Run every check for `spec` over `values`, stopping early once an eager
/// collector has its failure.
pub fn run_checks(
    schema: &str,
    spec: &ColumnSpec,
    values: &[Value],
    collector: &mut FailureCollector,
) {
    if !spec.nullable {
        for (row, value) in values.iter().enumerate() {
            if collector.is_done() {
                return;
            }
            if value.is_null() {
                collector.push(
                    FailureCase::new(schema, NOT_NULLABLE, value.clone())
                        .column(&spec.name)
                        .row(row),
                );
            }
        }
    }

    if spec.unique {
        report_mask(
            schema,
            spec,
            FIELD_UNIQUENESS,
            None,
            None,
            &Check::unique(),
            values,
            collector,
        );
    }

    for (number, check) in spec.checks.iter().enumerate() {
        if collector.is_done() {
            return;
        }
        debug!(column = %spec.name, check = check.name(), "Running check");
        report_mask(
            schema,
            spec,
            check.name(),
            check.check_value(),
            Some(number),
            check,
            values,
            collector,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn report_mask(
    schema: &str,
    spec: &ColumnSpec,
    name: &str,
    check_value: Option<String>,
    check_number: Option<usize>,
    check: &Check,
    values: &[Value],
    collector: &mut FailureCollector,
) {
    let base = |failure_case: Value| {
        let case = FailureCase::new(schema, name, failure_case)
            .column(&spec.name)
            .check_value(check_value.clone());
        match check_number {
            Some(n) => case.check_number(n),
            None => case,
        }
    };

    match check.evaluate(values) {
        Ok(mask) => {
            for (row, (passed, value)) in mask.iter().zip(values).enumerate() {
                if collector.is_done() {
                    return;
                }
                if !passed {
                    collector.push(base(value.clone()).row(row));
                }
            }
        }
        // A broken predicate fails the whole column rather than the process.
        Err(err) => collector.push(base(Value::String(err.to_string()))),
    }
}

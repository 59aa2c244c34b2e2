//! End-to-end validation scenarios.

use colguard_protocol::{Column, DataType, Table, Value};
use colguard_schema::{Check, ColumnSpec, CustomCheck, Schema};
use colguard_validator::{
    validate, Arguments, Boundary, BoundaryFailure, BoundarySite, Completeness, ValidationFailure,
    ValidationMode, Validator,
};
use serde_json::json;

fn fruits_schema() -> Schema {
    Schema::declare(
        "fruits",
        [
            ColumnSpec::new("item", DataType::String).with_check(Check::isin(["apple", "orange"])),
            ColumnSpec::new("price", DataType::Float64).with_check(Check::gt(0.0)),
        ],
    )
    .unwrap()
}

fn records(rows: serde_json::Value) -> Table {
    let rows = rows.as_array().cloned().unwrap_or_default();
    Table::from_records(&rows).unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

/// Test that conforming data validates with no failures
#[test]
fn test_scenario_a_valid_table() {
    let table = records(json!([
        {"item": "apple", "price": 0.5},
        {"item": "orange", "price": 0.75},
    ]));
    let validated = validate(&fruits_schema(), &table, true).unwrap();
    assert_eq!(validated, table);
}

/// Test that lazy mode reports one failure per violated check
#[test]
fn test_scenario_b_lazy_failures() {
    let table = records(json!([
        {"item": "applee", "price": 0.5},
        {"item": "orange", "price": -1000},
    ]));
    let err = validate(&fruits_schema(), &table, true).unwrap_err();
    assert!(matches!(err, ValidationFailure::Aggregated(_)));

    let report = err.report();
    assert_eq!(report.completeness(), Completeness::Complete);
    assert_eq!(report.len(), 2);

    let item = &report.failure_cases()[0];
    assert_eq!(item.column.as_deref(), Some("item"));
    assert_eq!(item.check, "isin");
    assert_eq!(item.row_index, Some(0));
    assert_eq!(item.failure_case, Value::from("applee"));

    let price = &report.failure_cases()[1];
    assert_eq!(price.column.as_deref(), Some("price"));
    assert_eq!(price.check, "gt");
    assert_eq!(price.row_index, Some(1));
    assert_eq!(price.failure_case, Value::Int64(-1000));
}

/// Test that an output missing a required column is an output failure
#[test]
fn test_scenario_c_missing_output_column() {
    let output_schema = Schema::declare(
        "fruits_out",
        [
            ColumnSpec::new("item", DataType::String),
            ColumnSpec::new("expiry", DataType::Date),
        ],
    )
    .unwrap();
    let boundary = Boundary::new(ValidationMode::Lazy)
        .input("df", fruits_schema())
        .output(output_schema);

    let input = records(json!([{"item": "apple", "price": 0.5}]));
    let err = boundary
        .call(Arguments::new().with("df", input), |mut args| {
            args.take("df").unwrap_or_else(Table::empty)
        })
        .unwrap_err();

    let BoundaryFailure::Output(failure) = err else {
        panic!("expected an output failure");
    };
    let cases = failure.report().failure_cases();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].check, "column_in_dataframe");
    assert_eq!(cases[0].column.as_deref(), Some("expiry"));
    assert_eq!(cases[0].row_index, None);
    assert_eq!(cases[0].site, Some(BoundarySite::Output));
}

// ============================================================================
// Properties
// ============================================================================

fn messy_schema() -> Schema {
    Schema::declare(
        "messy",
        [
            ColumnSpec::new("id", DataType::Int64).coerce(true).unique(true),
            ColumnSpec::new("name", DataType::String)
                .with_check(Check::str_length(Some(2), None))
                .with_check(Check::str_matches("[A-Z]").unwrap()),
            ColumnSpec::new("score", DataType::Float64)
                .nullable(true)
                .with_check(Check::in_range(0.0, 1.0)),
            ColumnSpec::new("when", DataType::Date).coerce(true),
            ColumnSpec::new("missing", DataType::String),
        ],
    )
    .unwrap()
    .with_strict(true)
}

fn messy_table() -> Table {
    records(json!([
        {"id": "1", "name": "Al", "score": 0.5, "when": "2024-01-01", "extra": 1},
        {"id": "x", "name": "b", "score": 2.0, "when": "not a date", "extra": 2},
        {"id": "1", "name": "Cy", "score": null, "when": "01/02/2024", "extra": 3},
    ]))
}

/// Test that the eager failure is the first lazy failure
#[test]
fn test_lazy_is_superset_of_eager() {
    let schema = messy_schema();
    let table = messy_table();

    let lazy = validate(&schema, &table, true).unwrap_err();
    let eager = validate(&schema, &table, false).unwrap_err();

    assert!(matches!(eager, ValidationFailure::Single(_)));
    assert_eq!(eager.report().len(), 1);
    assert_eq!(eager.report().completeness(), Completeness::FirstOnly);
    assert!(lazy.report().len() > 1);
    assert_eq!(
        eager.report().failure_cases()[0],
        lazy.report().failure_cases()[0]
    );
    assert!(lazy
        .report()
        .failure_cases()
        .contains(&eager.report().failure_cases()[0]));
}

/// Test every failure kind is surfaced in evaluation order
#[test]
fn test_lazy_report_contents() {
    let err = validate(&messy_schema(), &messy_table(), true).unwrap_err();
    let got: Vec<(Option<&str>, &str, Option<usize>)> = err
        .report()
        .failure_cases()
        .iter()
        .map(|c| (c.column.as_deref(), c.check.as_str(), c.row_index))
        .collect();
    assert_eq!(
        got,
        vec![
            (Some("extra"), "column_in_schema", None),
            (Some("id"), "coerce_dtype", Some(1)),
            (Some("id"), "field_uniqueness", Some(0)),
            (Some("id"), "field_uniqueness", Some(2)),
            (Some("name"), "str_length", Some(1)),
            (Some("name"), "str_matches", Some(1)),
            (Some("score"), "in_range", Some(1)),
            (Some("when"), "coerce_dtype", Some(1)),
            (Some("missing"), "column_in_dataframe", None),
        ]
    );
}

/// Test that parallel lazy validation matches the sequential report
#[test]
fn test_parallel_matches_sequential() {
    let schema = messy_schema();
    let table = messy_table();
    let sequential = Validator::lazy().validate(&schema, &table).unwrap_err();
    for threads in [2, 3, 8] {
        let parallel = Validator::lazy()
            .with_threads(threads)
            .validate(&schema, &table)
            .unwrap_err();
        assert_eq!(parallel, sequential, "threads = {}", threads);
    }
}

/// Test that revalidating coerced output adds no failures and changes nothing
#[test]
fn test_coercion_is_idempotent() {
    let schema = Schema::declare(
        "coerced",
        [
            ColumnSpec::new("n", DataType::Int64).coerce(true),
            ColumnSpec::new("d", DataType::Date).coerce(true),
        ],
    )
    .unwrap();
    let table = records(json!([{"n": "7", "d": "2024-03-01"}, {"n": 8, "d": "03/02/2024"}]));

    let once = validate(&schema, &table, true).unwrap();
    let twice = validate(&schema, &once, true).unwrap();
    assert_eq!(once, twice);
}

/// Test that passing data round-trips with unchanged rows and columns
#[test]
fn test_round_trip_preserves_unchanged_columns() {
    let schema = fruits_schema()
        .extend([ColumnSpec::new("qty", DataType::Int64).coerce(true)])
        .unwrap();
    let table = records(json!([
        {"item": "apple", "price": 0.5, "qty": "3", "note": "fresh"},
        {"item": "orange", "price": 1.25, "qty": 4, "note": null},
    ]));
    let validated = validate(&schema, &table, true).unwrap();
    assert_eq!(validated.num_rows(), table.num_rows());
    assert_eq!(validated.column_names(), table.column_names());
    for name in ["item", "price", "note"] {
        assert_eq!(validated.column(name), table.column(name));
    }
    assert_eq!(
        validated.column("qty").unwrap().values,
        vec![Value::Int64(3), Value::Int64(4)]
    );
}

/// Test that an integer and an equal float are duplicates in a float column
#[test]
fn test_unique_float_column_matches_integer_duplicates() {
    let schema =
        Schema::declare("prices", [ColumnSpec::new("price", DataType::Float64).unique(true)])
            .unwrap();
    let table = records(json!([{"price": 1}, {"price": 1.0}, {"price": 2.5}]));

    let err = validate(&schema, &table, true).unwrap_err();
    let rows: Vec<Option<usize>> = err
        .report()
        .failure_cases()
        .iter()
        .map(|case| case.row_index)
        .collect();
    assert_eq!(rows, vec![Some(0), Some(1)]);
    assert!(err
        .report()
        .failure_cases()
        .iter()
        .all(|case| case.check == "field_uniqueness"));
}

/// Test that unique-together keys compare numbers by value
#[test]
fn test_multiple_fields_unique_matches_integer_duplicates() {
    let schema = fruits_schema().with_unique(&["item", "price"]).unwrap();
    let table = records(json!([
        {"item": "apple", "price": 2},
        {"item": "apple", "price": 2.0},
        {"item": "orange", "price": 2},
    ]));

    let err = validate(&schema, &table, true).unwrap_err();
    let report = err.report();
    assert_eq!(report.len(), 2);
    assert!(report
        .failure_cases()
        .iter()
        .all(|case| case.check == "multiple_fields_uniqueness"));
}

/// Test that removing part of a unique-together constraint drops it
#[test]
fn test_removed_unique_member_does_not_tighten_constraint() {
    let schema = fruits_schema()
        .extend([ColumnSpec::new("qty", DataType::Int64)])
        .unwrap()
        .with_unique(&["item", "price"])
        .unwrap()
        .remove_columns(&["price"])
        .unwrap();
    let table = records(json!([
        {"item": "apple", "qty": 1},
        {"item": "apple", "qty": 2},
    ]));

    assert!(validate(&schema, &table, true).is_ok());
}

/// Test that custom checks report under their own name
#[test]
fn test_custom_check_provenance() {
    let even = CustomCheck::element_wise("is_even", |v: &Value| {
        matches!(v, Value::Int64(i) if i % 2 == 0)
    });
    let schema = Schema::declare(
        "evens",
        [ColumnSpec::new("n", DataType::Int64).with_check(Check::custom(even))],
    )
    .unwrap();
    let table = Table::new(vec![Column::from_values("n", vec![2i64, 3, 4])]).unwrap();

    let err = validate(&schema, &table, true).unwrap_err();
    let case = err.failure_case().unwrap();
    assert_eq!(case.check, "is_even");
    assert_eq!(case.row_index, Some(1));
    assert_eq!(case.check_number, Some(0));
}

/// Test that validation reports and validated tables convert to Arrow
#[test]
fn test_report_to_record_batch() {
    let table = records(json!([
        {"item": "applee", "price": 0.5},
        {"item": "orange", "price": -1000},
    ]));
    let err = validate(&fruits_schema(), &table, true).unwrap_err();
    let batch = err.report().to_record_batch().unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.schema().field(0).name(), "schema");
}

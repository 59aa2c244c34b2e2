//! Output formatting utilities for CLI commands

use colguard_validator::{FailureCase, ValidationReport};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

pub const FAILURE_HEADERS: &[&str] = &[
    "column",
    "check",
    "check_value",
    "row",
    "failure_case",
];

/// Print a table with styled headers
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}

/// One display row per failure case
pub fn failure_rows(report: &ValidationReport) -> Vec<Vec<String>> {
    report.failure_cases().iter().map(failure_row).collect()
}

fn failure_row(case: &FailureCase) -> Vec<String> {
    vec![
        case.column.clone().unwrap_or_else(|| "-".to_string()),
        case.check.clone(),
        case.check_value.clone().unwrap_or_default(),
        case.row_index
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string()),
        case.failure_case.render(),
    ]
}

/// Print the per-column/check summary followed by every failure
pub fn print_report(report: &ValidationReport) {
    let summary: Vec<Vec<String>> = report
        .summary()
        .into_iter()
        .map(|row| {
            vec![
                row.column.unwrap_or_else(|| "-".to_string()),
                row.check,
                row.failures.to_string(),
            ]
        })
        .collect();
    print_table(&["column", "check", "failures"], summary);
    print_table(FAILURE_HEADERS, failure_rows(report));
}

/// Pluralize a count: `plural(1, "row")` -> "1 row"
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

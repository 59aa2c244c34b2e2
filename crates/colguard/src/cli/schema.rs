//! Schema command - load and display schema declarations

use crate::cli::error::HelpfulError;
use crate::cli::output::print_table;
use anyhow::Result;
use colguard_schema::declaration::from_path;
use colguard_schema::{CheckRegistry, Schema, SchemaError};
use std::path::Path;

/// Load a schema declaration file. Custom checks are not available from the
/// command line, so declarations referencing them fail to load.
pub fn load_schema(path: &Path) -> Result<Schema> {
    from_path(path, &CheckRegistry::new()).map_err(|err| match &err {
        SchemaError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            HelpfulError::file_not_found(path).into()
        }
        _ => HelpfulError::invalid_schema(path, &err.to_string()).into(),
    })
}

/// `colguard schema show`
pub fn show(path: &Path, json: bool) -> Result<()> {
    let schema = load_schema(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&schema.to_declaration())?);
        return Ok(());
    }

    println!("Schema: {}", schema.name());
    if let Some(description) = schema.description() {
        println!("  {}", description);
    }
    println!(
        "Options: strict={} ordered={} coerce={}",
        schema.strict(),
        schema.ordered(),
        schema.coerce()
    );
    if !schema.unique().is_empty() {
        println!("Unique together: {}", schema.unique().join(", "));
    }

    let rows = schema
        .columns()
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.data_type.to_string(),
                yes_no(c.nullable),
                yes_no(c.coerce),
                yes_no(c.required),
                yes_no(c.unique),
                c.checks
                    .iter()
                    .map(|check| match check.check_value() {
                        Some(value) => format!("{}({})", check.name(), value),
                        None => check.name().to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            ]
        })
        .collect();
    print_table(
        &["column", "type", "nullable", "coerce", "required", "unique", "checks"],
        rows,
    );
    Ok(())
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

//! Colguard core data model.
//!
//! Format-agnostic tables addressed by column name, the cell values they
//! hold, and the canonical set of declared column types. Every other colguard
//! crate speaks these types.
//!
//! # Modules
//!
//! - [`types`]: Canonical `DataType` (declared column types)
//! - [`value`]: `Value`, one cell of a table
//! - [`table`]: `Column` and `Table`
//! - [`cast`]: Element-wise casting into a declared type
//! - [`batch`]: Arrow `RecordBatch` conversion

pub mod batch;
pub mod cast;
pub mod table;
pub mod types;
pub mod value;

pub use cast::cast_value;
pub use table::{Column, Table, TableError};
pub use types::DataType;
pub use value::Value;

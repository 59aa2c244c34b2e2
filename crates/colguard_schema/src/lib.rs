//! Declarative table schemas.
//!
//! A [`Schema`] is an ordered, immutable collection of [`ColumnSpec`]s, each
//! carrying a declared type, nullability and coercion policy, and an ordered
//! list of [`Check`]s. Composition (`extend`, `add_columns`, `remove_columns`,
//! `update_column`, ...) returns new schemas.
//!
//! Schemas can be built in code or loaded from JSON/YAML declarations, see
//! [`declaration`].
//!
//! ```
//! use colguard_protocol::DataType;
//! use colguard_schema::{Check, ColumnSpec, Schema};
//!
//! let schema = Schema::declare(
//!     "fruits",
//!     [
//!         ColumnSpec::new("item", DataType::String).with_check(Check::isin(["apple", "orange"])),
//!         ColumnSpec::new("price", DataType::Float64).with_check(Check::gt(0.0)),
//!     ],
//! )
//! .unwrap();
//! assert_eq!(schema.column_names(), vec!["item", "price"]);
//! ```

pub mod check;
pub mod column;
pub mod declaration;
pub mod error;
pub mod registry;
pub mod schema;

pub use check::{Check, CheckError, CheckKind, CustomCheck, Pattern};
pub use column::{ColumnOverrides, ColumnSpec};
pub use error::{SchemaError, SchemaResult};
pub use registry::CheckRegistry;
pub use schema::Schema;

//! Colguard validation engine.
//!
//! Validates a [`Table`](colguard_protocol::Table) against a
//! [`Schema`](colguard_schema::Schema): coerces declared columns, runs every
//! check and aggregates failures into a [`ValidationReport`].
//!
//! # Modules
//!
//! - [`coercion`]: element-wise coercion into declared types
//! - [`check_engine`]: nullability, uniqueness and declared checks per column
//! - [`aggregator`]: per-pass failure sink
//! - [`report`]: `FailureCase` and `ValidationReport`
//! - [`validator`]: eager/lazy orchestration, optional column parallelism
//! - [`boundary`]: validation around a function call

pub mod aggregator;
pub mod boundary;
pub mod check_engine;
pub mod coercion;
pub mod report;
pub mod validator;

pub use boundary::{Arguments, Boundary, BoundaryFailure};
pub use report::{
    BoundarySite, Completeness, FailureCase, SummaryRow, ValidationMode, ValidationReport,
};
pub use validator::{validate, Validate, ValidationFailure, Validator, ValidatorConfig};

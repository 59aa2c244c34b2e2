//! CLI commands for colguard.

pub mod error;
pub mod input;
pub mod output;
pub mod schema;
pub mod validate;

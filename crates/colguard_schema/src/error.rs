//! Schema errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while declaring, composing or loading a schema.
///
/// Composition errors are raised synchronously by the operation that caused
/// them; none of them is retryable.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema '{schema}' declares column '{column}' more than once")]
    DuplicateColumn { schema: String, column: String },

    #[error("schema '{schema}' has no column named '{column}'")]
    UnknownColumn { schema: String, column: String },

    #[error("unknown custom check '{0}'")]
    UnknownCheck(String),

    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid schema declaration at {path}: {message}")]
    InvalidDeclaration { path: String, message: String },

    #[error("failed to parse JSON schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML schema: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SchemaError {
    pub(crate) fn declaration(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::InvalidDeclaration {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type SchemaResult<T> = Result<T, SchemaError>;

//! Error types for archive binding and schema transpilation.

use thiserror::Error;

use crate::container::ContainerError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Unresolved type `{token}` at {path}")]
    UnresolvedType { path: String, token: String },

    #[error("Missing required field at {path}")]
    MissingRequiredField { path: String },

    #[error("Unknown job kind `{kind}` at {path}")]
    UnknownVariant { path: String, kind: String },

    #[error("Field `{field}` is not declared by any node in this archive")]
    FieldNotDeclared { field: String },

    #[error("Invalid type token `{token}`: {message}")]
    InvalidTypeToken { token: String, message: String },

    #[error("Invalid ordering key `{name}` under {path} (expected a non-negative integer)")]
    InvalidOrderingKey { path: String, name: String },

    #[error("Schema error at {path}: {message}")]
    SchemaError { path: String, message: String },

    #[error("Recursion depth exceeded at {path} (max: {max_depth})")]
    RecursionDepthExceeded { path: String, max_depth: usize },
}

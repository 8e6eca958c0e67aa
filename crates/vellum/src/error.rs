//! Error types for the database core.

use thiserror::Error;
use vellum_engine::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A record, table, index, or parameter is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A table or index with the same name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Record id collision or unique-index violation.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A value is not convertible to the required type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A field constraint was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Parser-level failure, with the byte offset in the source text.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    /// The planner refuses the query.
    #[error("plan error: {0}")]
    Plan(String),

    /// Statement execution was cancelled through its token.
    #[error("query cancelled")]
    Cancelled,

    /// Malformed encoded bytes.
    #[error("codec error: {0}")]
    Codec(String),

    /// Passthrough of engine failures.
    #[error("engine error: {0}")]
    Engine(#[from] StoreError),
}

impl Error {
    pub(crate) fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

//! Error types for pgdsl

use crate::value::ValueKind;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for pgdsl operations
pub type DslResult<T> = Result<T, DslError>;

/// Top-level error for query composition, projection and execution.
#[derive(Debug, Error)]
pub enum DslError {
    /// Rejected search condition.
    ///
    /// Composers accept any condition shape today; nothing constructs this yet.
    #[error("Invalid search condition: {0}")]
    Composer(String),

    /// Row-to-object binding failed
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// Failure reported by the relational client, passed through untouched
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// Builder misuse (e.g. a SELECT without FROM)
    #[error("Validation error: {0}")]
    Validation(String),

    /// `fetch_one` matched more than one row
    #[error("Expected at most one row, got {0}")]
    NonUnique(usize),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DslError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this error came from the executor
    pub fn is_executor(&self) -> bool {
        matches!(self, Self::Executor(_))
    }

    /// Check if this is a projection error
    pub fn is_projection(&self) -> bool {
        matches!(self, Self::Projection(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Executor(ExecutorError::Timeout(_)))
    }
}

impl From<tokio_postgres::Error> for DslError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Executor(ExecutorError::Query(err))
    }
}

/// Type or arity mismatch while binding a row into an output shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// The row has no column with the requested label
    #[error("Column '{column}' is not present in the result row")]
    MissingColumn { column: String },

    /// A positional constructor argument has no source column
    #[error("Missing constructor argument at position {position}")]
    MissingArgument { position: usize },

    /// More source columns than constructor arguments
    #[error("Constructor takes {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },

    /// Declared target type does not accept the value
    #[error("Type mismatch for '{target}': expected {expected}, found {found}")]
    TypeMismatch {
        target: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// Database value could not be decoded
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Column type has no `Value` representation
    #[error("Unsupported type '{type_name}' on column '{column}'")]
    UnsupportedType { column: String, type_name: String },
}

impl ProjectionError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(target: impl Into<String>, err: crate::value::ValueError) -> Self {
        Self::TypeMismatch {
            target: target.into(),
            expected: err.expected,
            found: err.found,
        }
    }
}

/// Opaque failure of the relational client.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(Duration),

    /// In-memory store failure (unknown table/column, poisoned lock)
    #[error("Store error: {0}")]
    Store(String),
}

impl ExecutorError {
    pub(crate) fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DslError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Executor(ExecutorError::Pool(err.to_string()))
    }
}

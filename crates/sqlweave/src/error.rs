//! Error types for sqlweave

use crate::binding::Binding;
use std::fmt;
use thiserror::Error;

/// Result type alias for sqlweave operations
pub type QbResult<T> = Result<T, QbError>;

/// Boxed error produced by a database driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for statement building and execution
#[derive(Debug, Error)]
pub enum QbError {
    /// The builder is in a state that cannot produce valid SQL
    #[error("Build error: {0}")]
    Build(String),

    /// No adapter could be resolved for the requested connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver rejected or failed the statement
    #[error(transparent)]
    Execution(Box<ExecutionError>),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl QbError {
    /// Create a build-configuration error
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a build-configuration error
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The execution details, if this error came from the driver.
    pub fn execution(&self) -> Option<&ExecutionError> {
        match self {
            Self::Execution(e) => Some(e),
            _ => None,
        }
    }
}

/// Error reported by an [`Adapter`](crate::adapter::Adapter) while running a statement.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct DriverError {
    /// Whether the statement was successfully prepared before failing.
    pub prepared: bool,
    /// The underlying driver error.
    pub source: BoxError,
}

impl DriverError {
    /// The driver failed before the statement was prepared (syntax, connectivity).
    pub fn unprepared(source: impl Into<BoxError>) -> Self {
        Self {
            prepared: false,
            source: source.into(),
        }
    }

    /// The driver failed after preparing (constraint violations, runtime errors).
    pub fn prepared(source: impl Into<BoxError>) -> Self {
        Self {
            prepared: true,
            source: source.into(),
        }
    }
}

/// A driver failure enriched with the exact statement that failed.
#[derive(Debug)]
pub struct ExecutionError {
    /// Statement text as emitted by the builder (named placeholders).
    pub sql: String,
    /// Ordered bindings sent with the statement.
    pub bindings: Vec<Binding>,
    /// Connection name the statement targeted (`None` = default).
    pub connection: Option<String>,
    /// Whether the statement reached the prepared stage.
    pub prepared: bool,
    /// The driver error.
    pub source: BoxError,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = if self.prepared { "after prepare" } else { "prepare" };
        write!(f, "Execution error ({stage}): {}\n  sql: {}", self.source, self.sql)
    }
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<ExecutionError> for QbError {
    fn from(err: ExecutionError) -> Self {
        Self::Execution(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_build_error_display() {
        let err = QbError::build("no FROM source");
        assert_eq!(err.to_string(), "Build error: no FROM source");
        assert!(err.is_build());
    }

    #[test]
    fn test_execution_error_keeps_statement() {
        let err: QbError = ExecutionError {
            sql: "SELECT * FROM users WHERE id = :id".to_string(),
            bindings: vec![Binding::new("id", Value::Int(5))],
            connection: None,
            prepared: true,
            source: "boom".into(),
        }
        .into();

        let exec = err.execution().expect("execution error");
        assert_eq!(exec.bindings.len(), 1);
        assert!(err.to_string().contains("after prepare"));
        assert!(err.to_string().contains("SELECT * FROM users"));
    }
}

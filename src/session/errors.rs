//! Session error types.

use thiserror::Error;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by the session boundary.
///
/// Statement preparation fails fast on syntax or schema problems; execution
/// fails on bind-time problems (parameter count, type mismatches) or on
/// violations of the store's single-partition access discipline. `Connection`
/// is the transport-failure case a remote backend would surface; callers
/// treat it the same way as any other execution failure: propagate, never
/// retry inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Statement text could not be parsed
    #[error("syntax error: {0}")]
    Syntax(String),

    /// CQL feature outside the supported subset
    #[error("unsupported statement: {0}")]
    Unsupported(String),

    /// Keyspace does not exist
    #[error("unknown keyspace: {0}")]
    UnknownKeyspace(String),

    /// Table does not exist in the target keyspace
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Column not defined by the table schema
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Keyspace or table already exists (without IF NOT EXISTS)
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Statement is well-formed but violates access rules
    /// (e.g. partition key not fully restricted)
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Bind parameter count does not match the statement's placeholders
    #[error("expected {expected} bind parameters, got {got}")]
    ParameterCount { expected: usize, got: usize },

    /// Bound value type does not match the column type
    #[error("type mismatch for column '{column}': expected {expected}, got {got}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        got: &'static str,
    },

    /// Transport-level failure (connection loss, timeout)
    #[error("connection error: {0}")]
    Connection(String),
}

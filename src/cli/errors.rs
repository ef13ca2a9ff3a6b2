//! CLI-specific error types
//!
//! Every variant is fatal: `run` reports it and the process exits non-zero.

use thiserror::Error;

use crate::migrate::MigrateError;
use crate::session::SessionError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Schema migration failed during boot
    #[error("migration failed: {0}")]
    Migrate(#[from] MigrateError),

    /// The storage session rejected a statement during boot
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// I/O error (listener, runtime)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

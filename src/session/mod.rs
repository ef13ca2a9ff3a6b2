//! Storage session boundary.
//!
//! The store talks to its wide-column backend through the [`Session`] trait,
//! which mirrors a cluster driver's surface: prepare once, execute many, plus
//! a dynamic path for DDL and ad-hoc statements. The shipped implementation
//! is the embedded [`MemorySession`]; a remote cluster client would implement
//! the same trait.

mod cql;
mod errors;
mod memory;
mod statement;
mod value;

pub use errors::{SessionError, SessionResult};
pub use memory::{MemoryCluster, MemorySession};
pub use statement::Statement;
pub use value::{Rows, Value};

/// A keyspace-bound connection to a wide-column store.
///
/// Statements are single-table and single-row-range; there is no atomicity
/// across statements. Unqualified table names resolve against the keyspace
/// the session was opened with.
pub trait Session: Send + Sync {
    /// Parse a statement and validate it against the live schema, returning
    /// a reusable handle. Fails early on unknown tables or columns and on
    /// restrictions the store cannot serve.
    fn prepare(&self, cql: &str) -> SessionResult<Statement>;

    /// Execute a prepared statement with bind parameters, in placeholder
    /// order. Parameters are type-checked against the table schema.
    fn execute(&self, statement: &Statement, params: &[Value]) -> SessionResult<Rows>;

    /// Parse and execute in one step. Used for DDL and dynamic statements
    /// where preparation buys nothing.
    fn execute_raw(&self, cql: &str, params: &[Value]) -> SessionResult<Rows>;
}

//! Prepared statement handle.

use std::sync::Arc;

use super::cql::CqlStatement;

/// A statement prepared against a session.
///
/// Holds the original text and the parsed form. Handles are cheap to clone
/// and can be executed any number of times with fresh bind parameters.
#[derive(Debug, Clone)]
pub struct Statement {
    cql: Arc<str>,
    pub(crate) parsed: Arc<CqlStatement>,
}

impl Statement {
    pub(crate) fn new(cql: &str, parsed: CqlStatement) -> Self {
        Self {
            cql: Arc::from(cql),
            parsed: Arc::new(parsed),
        }
    }

    /// The statement text as given to `prepare`.
    pub fn cql(&self) -> &str {
        &self.cql
    }

    /// Number of bind parameters the statement expects.
    pub fn placeholders(&self) -> usize {
        self.parsed.placeholders()
    }
}

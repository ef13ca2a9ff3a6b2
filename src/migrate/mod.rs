//! Migration runner for the wide-column schema.
//!
//! Applies `.cql` files from a directory in sorted filename order and tracks
//! what ran in a `schema_migrations` table. The first file bootstraps the
//! keyspace and always executes; the tracking-table file is ensured before
//! the applied set is read. Both are idempotent `IF NOT EXISTS` statements,
//! so re-running them before they are recorded is harmless.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::session::{Session, SessionError, Value};

pub type MigrateResult<T> = Result<T, MigrateError>;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("reading migrations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("applying {name}: {source}")]
    Statement {
        name: String,
        #[source]
        source: SessionError,
    },
}

/// Apply every pending migration from `dir`. Returns the names recorded in
/// this run, in application order.
pub fn run_migrations(session: &dyn Session, dir: &Path) -> MigrateResult<Vec<String>> {
    let files = migration_files(dir)?;
    if files.is_empty() {
        info!(dir = %dir.display(), "no migration files found");
        return Ok(Vec::new());
    }

    // The keyspace bootstrap must run before anything else can resolve.
    apply_file(session, &files[0])?;

    // Ensure the tracking table exists before reading it.
    for file in &files {
        if file_name(file).contains("schema_migrations") {
            apply_file(session, file)?;
        }
    }

    let applied = applied_names(session);
    info!(count = applied.len(), "previously applied migrations");

    let mut newly_applied = Vec::new();
    for file in &files {
        let name = file_name(file);
        if applied.contains(&name) {
            continue;
        }
        apply_file(session, file)?;
        record(session, &name)?;
        info!(migration = %name, "applied");
        newly_applied.push(name);
    }
    Ok(newly_applied)
}

/// `.cql` files in the directory, sorted by filename.
fn migration_files(dir: &Path) -> MigrateResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| MigrateError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MigrateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("cql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn apply_file(session: &dyn Session, file: &Path) -> MigrateResult<()> {
    let name = file_name(file);
    let text = std::fs::read_to_string(file).map_err(|source| MigrateError::Io {
        path: file.to_path_buf(),
        source,
    })?;

    for statement in split_statements(&text) {
        session
            .execute_raw(&statement, &[])
            .map_err(|source| MigrateError::Statement {
                name: name.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Names already recorded. A missing tracking table reads as an empty set;
/// on a fresh cluster nothing has been applied yet.
fn applied_names(session: &dyn Session) -> HashSet<String> {
    match session.execute_raw("SELECT name FROM schema_migrations", &[]) {
        Ok(rows) => rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_text).map(str::to_string))
            .collect(),
        Err(_) => HashSet::new(),
    }
}

fn record(session: &dyn Session, name: &str) -> MigrateResult<()> {
    session
        .execute_raw(
            "INSERT INTO schema_migrations (name, applied_at) VALUES (?, ?)",
            &[Value::from(name), Value::timestamp(Utc::now())],
        )
        .map_err(|source| MigrateError::Statement {
            name: name.to_string(),
            source,
        })?;
    Ok(())
}

/// Split a file into statements on `;`, dropping comment lines and empty
/// chunks.
fn split_statements(cql_text: &str) -> Vec<String> {
    cql_text
        .split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

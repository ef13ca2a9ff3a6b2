//! Dual-table persistence for task records.
//!
//! `tasks` holds the authoritative row per id; `tasks_by_status` is a
//! denormalized listing index partitioned by status, clustered by
//! `(created_at, id)`. The backend offers no cross-table atomicity, so the
//! store keeps the index in step with single-row statements only: a status
//! change deletes the old index entry and inserts the new one, then writes
//! the primary row. A failure between those writes can strand an index
//! entry; reads tolerate that by re-checking the primary table and skipping
//! entries whose id no longer resolves.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::domain::repository::TaskRepository;
use crate::domain::task::{Task, TaskStatus};
use crate::session::{Session, SessionError, SessionResult, Statement, Value};

/// Task repository over a wide-column session, one prepared statement per
/// access path.
pub struct TaskStore {
    session: Arc<dyn Session>,
    insert_task: Statement,
    insert_by_status: Statement,
    select_task: Statement,
    select_by_status: Statement,
    update_task: Statement,
    delete_task: Statement,
    delete_by_status: Statement,
}

impl TaskStore {
    /// Prepare every statement up front. Fails when the schema is missing,
    /// so a store handle implies the tables exist.
    pub fn new(session: Arc<dyn Session>) -> SessionResult<Self> {
        Ok(Self {
            insert_task: session.prepare(
                "INSERT INTO tasks (id, title, description, status, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?,
            insert_by_status: session.prepare(
                "INSERT INTO tasks_by_status (status, created_at, id, title) \
                 VALUES (?, ?, ?, ?)",
            )?,
            select_task: session.prepare(
                "SELECT id, title, description, status, created_at, updated_at \
                 FROM tasks WHERE id = ?",
            )?,
            select_by_status: session.prepare(
                "SELECT status, created_at, id, title \
                 FROM tasks_by_status WHERE status = ?",
            )?,
            update_task: session
                .prepare("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")?,
            delete_task: session.prepare("DELETE FROM tasks WHERE id = ?")?,
            delete_by_status: session.prepare(
                "DELETE FROM tasks_by_status WHERE status = ? AND created_at = ? AND id = ?",
            )?,
            session,
        })
    }

    /// Index entry for the snapshot's current status.
    fn index_entry(task: &Task) -> [Value; 4] {
        [
            Value::from(task.status.as_str()),
            Value::timestamp(task.created_at),
            Value::Uuid(task.id),
            Value::from(task.title.as_str()),
        ]
    }
}

impl TaskRepository for TaskStore {
    fn insert(&self, task: &Task) -> SessionResult<()> {
        // Primary row first, index entry second. A crash in between leaves
        // a primary row the index does not list, never a dangling entry.
        self.session.execute(
            &self.insert_task,
            &[
                Value::Uuid(task.id),
                Value::from(task.title.as_str()),
                Value::from(task.description.as_str()),
                Value::from(task.status.as_str()),
                Value::timestamp(task.created_at),
                Value::timestamp(task.updated_at),
            ],
        )?;
        self.session
            .execute(&self.insert_by_status, &Self::index_entry(task))?;
        Ok(())
    }

    fn get_by_id(&self, id: Uuid) -> SessionResult<Option<Task>> {
        let rows = self
            .session
            .execute(&self.select_task, &[Value::Uuid(id)])?;
        rows.one().map(task_from_row).transpose()
    }

    fn list_by_status(&self, status: TaskStatus) -> SessionResult<Vec<Task>> {
        let rows = self
            .session
            .execute(&self.select_by_status, &[Value::from(status.as_str())])?;

        // The index stores (status, created_at, id, title); the primary
        // table stays authoritative, so re-fetch each id and drop entries
        // that no longer resolve.
        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let id = row
                .get(2)
                .and_then(Value::as_uuid)
                .ok_or_else(|| column_error("id", "uuid", row.get(2)))?;
            match self.get_by_id(id)? {
                Some(task) => tasks.push(task),
                None => {
                    debug!(%id, status = status.as_str(), "skipping index entry with no primary row");
                }
            }
        }
        Ok(tasks)
    }

    fn update(&self, task: &Task) -> SessionResult<()> {
        // The live row decides whether the index entry moves. Two updates
        // racing on one id can each read the same old status; the loser's
        // index entry is left behind and tolerated by reads.
        if let Some(old) = self.get_by_id(task.id)? {
            if old.status != task.status {
                debug!(
                    id = %task.id,
                    from = old.status.as_str(),
                    to = task.status.as_str(),
                    "moving index entry"
                );
                self.session.execute(
                    &self.delete_by_status,
                    &[
                        Value::from(old.status.as_str()),
                        Value::timestamp(old.created_at),
                        Value::Uuid(task.id),
                    ],
                )?;
                self.session
                    .execute(&self.insert_by_status, &Self::index_entry(task))?;
            }
        }
        // Unconditional primary write; an absent row becomes one.
        self.session.execute(
            &self.update_task,
            &[
                Value::from(task.status.as_str()),
                Value::timestamp(task.updated_at),
                Value::Uuid(task.id),
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: Uuid) -> SessionResult<()> {
        // Read first: the index entry's key is (status, created_at, id),
        // known only from the live row.
        if let Some(old) = self.get_by_id(id)? {
            self.session.execute(
                &self.delete_by_status,
                &[
                    Value::from(old.status.as_str()),
                    Value::timestamp(old.created_at),
                    Value::Uuid(id),
                ],
            )?;
        }
        self.session.execute(&self.delete_task, &[Value::Uuid(id)])?;
        Ok(())
    }
}

/// Map a primary-table row in `(id, title, description, status, created_at,
/// updated_at)` order.
fn task_from_row(row: &[Value]) -> SessionResult<Task> {
    let id = row
        .get(0)
        .and_then(Value::as_uuid)
        .ok_or_else(|| column_error("id", "uuid", row.get(0)))?;
    let title = row
        .get(1)
        .and_then(Value::as_text)
        .ok_or_else(|| column_error("title", "text", row.get(1)))?
        .to_string();
    // A null description reads back as the empty string.
    let description = match row.get(2) {
        None | Some(Value::Null) => String::new(),
        Some(value) => value
            .as_text()
            .ok_or_else(|| column_error("description", "text", row.get(2)))?
            .to_string(),
    };
    let status: TaskStatus = row
        .get(3)
        .and_then(Value::as_text)
        .ok_or_else(|| column_error("status", "text", row.get(3)))?
        .parse()
        .map_err(|_| column_error("status", "task status", row.get(3)))?;
    let created_at = row
        .get(4)
        .and_then(Value::as_timestamp)
        .ok_or_else(|| column_error("created_at", "timestamp", row.get(4)))?;
    let updated_at = row
        .get(5)
        .and_then(Value::as_timestamp)
        .ok_or_else(|| column_error("updated_at", "timestamp", row.get(5)))?;

    Ok(Task {
        id,
        title,
        description,
        status,
        created_at,
        updated_at,
    })
}

fn column_error(column: &str, expected: &'static str, value: Option<&Value>) -> SessionError {
    SessionError::TypeMismatch {
        column: column.to_string(),
        expected,
        got: value.map(Value::type_name).unwrap_or("missing"),
    }
}

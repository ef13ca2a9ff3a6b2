//! Persistence port for task records.

use uuid::Uuid;

use crate::domain::task::{Task, TaskStatus};
use crate::session::SessionResult;

/// Storage operations the application layer depends on.
///
/// Backend failures propagate unchanged; a missing record is `None`, never
/// an error. Implemented by `store::TaskStore` and by test doubles.
pub trait TaskRepository: Send + Sync {
    /// Persist a new record. The caller guarantees the id is fresh.
    fn insert(&self, task: &Task) -> SessionResult<()>;

    /// Fetch a record by id.
    fn get_by_id(&self, id: Uuid) -> SessionResult<Option<Task>>;

    /// All records currently in the given status, ordered by
    /// `(created_at, id)` ascending.
    fn list_by_status(&self, status: TaskStatus) -> SessionResult<Vec<Task>>;

    /// Persist a new snapshot of an existing record.
    fn update(&self, task: &Task) -> SessionResult<()>;

    /// Remove a record. Deleting an absent id is a no-op.
    fn delete(&self, id: Uuid) -> SessionResult<()>;
}

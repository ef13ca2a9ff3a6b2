//! Task use cases.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::repository::TaskRepository;
use crate::domain::task::{Task, TaskStatus};
use crate::session::SessionError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("task {0} not found")]
    TaskNotFound(Uuid),
    /// Storage failures pass through unchanged.
    #[error(transparent)]
    Backend(#[from] SessionError),
}

/// Application service orchestrating the task repository.
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }

    /// Create and persist a new task in `todo` status.
    pub fn create(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> ServiceResult<Task> {
        let task = Task::new(title, description);
        self.repository.insert(&task)?;
        Ok(task)
    }

    pub fn get(&self, id: Uuid) -> ServiceResult<Task> {
        self.repository
            .get_by_id(id)?
            .ok_or(ServiceError::TaskNotFound(id))
    }

    /// List tasks, optionally filtered by status.
    ///
    /// With a filter the repository's clustering order is kept (oldest
    /// first). Without one there is no single access path, so the three
    /// status partitions are merged and re-sorted newest first.
    pub fn list(&self, status: Option<TaskStatus>) -> ServiceResult<Vec<Task>> {
        match status {
            Some(status) => Ok(self.repository.list_by_status(status)?),
            None => {
                let mut tasks = Vec::new();
                for status in TaskStatus::ALL {
                    tasks.extend(self.repository.list_by_status(status)?);
                }
                tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok(tasks)
            }
        }
    }

    /// Move an existing task to a new status, returning the new snapshot.
    pub fn update_status(&self, id: Uuid, status: TaskStatus) -> ServiceResult<Task> {
        let task = self.get(id)?;
        let updated = task.with_status(status);
        self.repository.update(&updated)?;
        Ok(updated)
    }

    /// Delete an existing task. Missing ids are reported before the
    /// idempotent store delete would hide them.
    pub fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id)?;
        self.repository.delete(id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionResult;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockRepository {
        tasks: Mutex<HashMap<Uuid, Task>>,
        fail_reads: bool,
    }

    impl MockRepository {
        fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Arc<Self> {
            let map = tasks.into_iter().map(|t| (t.id, t)).collect();
            Arc::new(Self {
                tasks: Mutex::new(map),
                fail_reads: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                tasks: Mutex::default(),
                fail_reads: true,
            })
        }
    }

    impl TaskRepository for MockRepository {
        fn insert(&self, task: &Task) -> SessionResult<()> {
            self.tasks.lock().unwrap().insert(task.id, task.clone());
            Ok(())
        }

        fn get_by_id(&self, id: Uuid) -> SessionResult<Option<Task>> {
            if self.fail_reads {
                return Err(SessionError::Connection("backend unavailable".to_string()));
            }
            Ok(self.tasks.lock().unwrap().get(&id).cloned())
        }

        fn list_by_status(&self, status: TaskStatus) -> SessionResult<Vec<Task>> {
            if self.fail_reads {
                return Err(SessionError::Connection("backend unavailable".to_string()));
            }
            let mut tasks: Vec<Task> = self
                .tasks
                .lock()
                .unwrap()
                .values()
                .filter(|t| t.status == status)
                .cloned()
                .collect();
            tasks.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
            Ok(tasks)
        }

        fn update(&self, task: &Task) -> SessionResult<()> {
            self.tasks.lock().unwrap().insert(task.id, task.clone());
            Ok(())
        }

        fn delete(&self, id: Uuid) -> SessionResult<()> {
            self.tasks.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    fn task_created_at(seconds: i64, status: TaskStatus) -> Task {
        let at = Utc.timestamp_opt(seconds, 0).unwrap();
        Task {
            id: Uuid::new_v4(),
            title: format!("task at {}", seconds),
            description: String::new(),
            status,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_create_persists_and_returns_todo_task() {
        let repository = MockRepository::with_tasks([]);
        let service = TaskService::new(repository.clone());

        let task = service.create("ship it", "eventually").unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(
            repository.tasks.lock().unwrap().get(&task.id),
            Some(&task)
        );
    }

    #[test]
    fn test_get_missing_task_is_not_found() {
        let service = TaskService::new(MockRepository::with_tasks([]));
        let id = Uuid::new_v4();
        match service.get(id) {
            Err(ServiceError::TaskNotFound(missing)) => assert_eq!(missing, id),
            other => panic!("expected TaskNotFound, got {:?}", other.map(|t| t.id)),
        }
    }

    #[test]
    fn test_list_with_filter_keeps_repository_order() {
        let a = task_created_at(100, TaskStatus::Todo);
        let b = task_created_at(200, TaskStatus::Todo);
        let other = task_created_at(150, TaskStatus::Done);
        let service =
            TaskService::new(MockRepository::with_tasks([b.clone(), a.clone(), other]));

        let listed = service.list(Some(TaskStatus::Todo)).unwrap();
        assert_eq!(listed, vec![a, b]);
    }

    #[test]
    fn test_list_without_filter_merges_newest_first() {
        let oldest = task_created_at(100, TaskStatus::Done);
        let middle = task_created_at(200, TaskStatus::Todo);
        let newest = task_created_at(300, TaskStatus::InProgress);
        let service = TaskService::new(MockRepository::with_tasks([
            oldest.clone(),
            newest.clone(),
            middle.clone(),
        ]));

        let listed = service.list(None).unwrap();
        assert_eq!(listed, vec![newest, middle, oldest]);
    }

    #[test]
    fn test_update_status_returns_new_snapshot() {
        let original = task_created_at(100, TaskStatus::Todo);
        let repository = MockRepository::with_tasks([original.clone()]);
        let service = TaskService::new(repository.clone());

        let updated = service
            .update_status(original.id, TaskStatus::Done)
            .unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(
            repository.tasks.lock().unwrap().get(&original.id),
            Some(&updated)
        );
    }

    #[test]
    fn test_update_status_missing_task_is_not_found() {
        let service = TaskService::new(MockRepository::with_tasks([]));
        assert!(matches!(
            service.update_status(Uuid::new_v4(), TaskStatus::Done),
            Err(ServiceError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_delete_checks_existence_first() {
        let task = task_created_at(100, TaskStatus::Todo);
        let repository = MockRepository::with_tasks([task.clone()]);
        let service = TaskService::new(repository.clone());

        service.delete(task.id).unwrap();
        assert!(repository.tasks.lock().unwrap().is_empty());
        assert!(matches!(
            service.delete(task.id),
            Err(ServiceError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_backend_errors_pass_through() {
        let service = TaskService::new(MockRepository::failing());
        match service.get(Uuid::new_v4()) {
            Err(ServiceError::Backend(SessionError::Connection(_))) => {}
            other => panic!("expected backend error, got {:?}", other.map(|t| t.id)),
        }
    }
}

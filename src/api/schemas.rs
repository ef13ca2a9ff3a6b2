//! Request and response bodies for the task endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::task::{Task, TaskStatus};

/// Longest accepted title, in characters.
pub const TITLE_MAX_CHARS: usize = 200;
/// Longest accepted description, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct TaskCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusUpdate {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub count: usize,
    pub tasks: Vec<TaskResponse>,
}

impl TaskListResponse {
    pub fn new(tasks: Vec<Task>) -> Self {
        let tasks: Vec<TaskResponse> = tasks.into_iter().map(TaskResponse::from).collect();
        Self {
            count: tasks.len(),
            tasks,
        }
    }
}

//! Task entity and status lifecycle.
//!
//! A `Task` is an immutable value snapshot: mutations produce a new snapshot
//! via `with_status`, and the store persists the latest snapshot per id.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// All statuses, in lifecycle order. Used when listing without a filter.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    /// Returns the wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status: '{}'", self.0)
    }
}

impl std::error::Error for InvalidStatus {}

impl FromStr for TaskStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// A task record.
///
/// `created_at` is immutable after creation; `updated_at` is refreshed on
/// every status change. Both are held at millisecond precision, the store's
/// timestamp granularity. The status index is keyed partly by `created_at`,
/// so the value must round-trip through storage bit-exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with a generated id, status `todo`, and current
    /// timestamps.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            status: TaskStatus::Todo,
            created_at: now,
            updated_at: now,
        }
    }

    /// Return a copy with the given status and a refreshed `updated_at`.
    /// All other fields, including `created_at`, are preserved.
    pub fn with_status(&self, status: TaskStatus) -> Self {
        Self {
            status,
            updated_at: now_millis(),
            ..self.clone()
        }
    }
}

/// Current time truncated to millisecond precision.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis())
        .expect("current time representable in milliseconds")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("Test", "");
        assert_eq!(task.title, "Test");
        assert_eq!(task.description, "");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_new_tasks_get_distinct_ids() {
        let a = Task::new("A", "");
        let b = Task::new("B", "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_with_status_returns_new_snapshot() {
        let task = Task::new("Test", "details");
        let updated = task.with_status(TaskStatus::Done);

        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.id, task.id);
        assert_eq!(updated.title, task.title);
        assert_eq!(updated.created_at, task.created_at);
        assert!(updated.updated_at >= task.updated_at);
        // Original snapshot unchanged.
        assert_eq!(task.status, TaskStatus::Todo);
    }

    #[test]
    fn test_timestamps_have_millisecond_precision() {
        let task = Task::new("Test", "");
        assert_eq!(
            task.created_at.timestamp_subsec_micros() % 1000,
            0,
            "created_at must not carry sub-millisecond precision"
        );
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("archived".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: TaskStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(back, TaskStatus::Done);
    }
}

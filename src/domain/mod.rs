//! Domain model: task records and the persistence port.

pub mod repository;
pub mod task;

pub use repository::TaskRepository;
pub use task::{InvalidStatus, Task, TaskStatus};

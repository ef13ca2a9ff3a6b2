//! Application layer: task use cases over the repository port.

mod tasks;

pub use tasks::{ServiceError, ServiceResult, TaskService};

//! Persistence layer: the dual-table task store.

mod task_store;

pub use task_store::TaskStore;

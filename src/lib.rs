//! taskrow - a task tracker backed by a wide-column store
//!
//! Tasks live in a primary `tasks` table keyed by id. Listing by status
//! is served from a denormalized `tasks_by_status` table that the store
//! keeps consistent with the primary on every write.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod migrate;
pub mod service;
pub mod session;
pub mod store;

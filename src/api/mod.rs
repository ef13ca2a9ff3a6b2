//! HTTP layer for the task service.
//!
//! Thin handlers over `service::TaskService`: JSON bodies in, JSON bodies
//! out, errors mapped to status codes in `errors`. Nothing here touches the
//! storage protocol directly.

pub mod errors;
pub mod routes;
pub mod schemas;
pub mod server;

pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use server::HttpServer;

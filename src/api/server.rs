//! HTTP server for the task service.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::routes::{health_routes, task_routes, ApiState};
use crate::config::AppConfig;
use crate::service::TaskService;

/// HTTP server owning the configured address and the assembled router.
pub struct HttpServer {
    addr: String,
    router: Router,
}

impl HttpServer {
    /// Create a server exposing the given service.
    pub fn new(config: &AppConfig, service: TaskService) -> Self {
        Self {
            addr: config.socket_addr(),
            router: Self::build_router(service),
        }
    }

    /// Build the combined router with all endpoints
    fn build_router(service: TaskService) -> Router {
        let state = Arc::new(ApiState { service });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            // Health check at root level
            .merge(health_routes())
            // Task routes under /api/v1
            .nest("/api/v1", task_routes(state))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> &str {
        &self.addr
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.addr.as_str()).await?;
        info!(addr = %self.addr, "task api listening");
        axum::serve(listener, self.router).await
    }
}

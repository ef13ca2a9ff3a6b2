//! Task HTTP routes.
//!
//! Endpoints for creating, listing, fetching, re-statusing, and deleting
//! tasks, plus the root health check.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use super::schemas::{
    ListTasksQuery, TaskCreate, TaskListResponse, TaskResponse, TaskStatusUpdate,
    DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS,
};
use crate::service::TaskService;

// ==================
// Shared State
// ==================

/// State shared across task handlers
pub struct ApiState {
    pub service: TaskService,
}

// ==================
// Task Routes
// ==================

/// Create task routes
pub fn task_routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/tasks", post(create_task_handler))
        .route("/tasks", get(list_tasks_handler))
        .route("/tasks/:task_id", get(get_task_handler))
        .route("/tasks/:task_id", patch(update_task_status_handler))
        .route("/tasks/:task_id", delete(delete_task_handler))
        .with_state(state)
}

/// Health check route at root level
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

// ==================
// Helper Functions
// ==================

/// Minimal request checks; anything heavier belongs to the clients.
fn validate_create(body: &TaskCreate) -> ApiResult<()> {
    let title_chars = body.title.chars().count();
    if title_chars == 0 {
        return Err(ApiError::InvalidBody("title must not be empty".to_string()));
    }
    if title_chars > TITLE_MAX_CHARS {
        return Err(ApiError::InvalidBody(format!(
            "title exceeds {} characters",
            TITLE_MAX_CHARS
        )));
    }
    if let Some(description) = &body.description {
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(ApiError::InvalidBody(format!(
                "description exceeds {} characters",
                DESCRIPTION_MAX_CHARS
            )));
        }
    }
    Ok(())
}

// ==================
// Task Handlers
// ==================

async fn create_task_handler(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<TaskCreate>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    validate_create(&body)?;
    let task = state
        .service
        .create(body.title, body.description.unwrap_or_default())?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

async fn list_tasks_handler(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let tasks = state.service.list(query.status)?;
    Ok(Json(TaskListResponse::new(tasks)))
}

async fn get_task_handler(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state.service.get(task_id)?;
    Ok(Json(TaskResponse::from(task)))
}

async fn update_task_status_handler(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<TaskStatusUpdate>,
) -> ApiResult<StatusCode> {
    state.service.update_status(task_id, body.status)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_task_handler(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.delete(task_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================
// Health Check
// ==================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

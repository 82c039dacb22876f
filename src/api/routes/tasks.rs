//! Task handlers.

use super::CancelTaskResponse;
use crate::api::AppState;
use crate::api::error_response::api_error_response;
use crate::error::{ApiError, Error};
use crate::types::TaskId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Parse a path segment as a task id, or build the 400 response
fn parse_task_id(raw: &str) -> Result<TaskId, Response> {
    raw.parse().map_err(|_| {
        api_error_response(
            StatusCode::BAD_REQUEST,
            ApiError::validation(format!("'{raw}' is not a valid task id")),
        )
    })
}

/// GET /tasks - List all tasks
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "Every task, in submission order", body = Vec<crate::types::TaskRecord>)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.list())
}

/// GET /tasks/stats - Task counts per status
#[utoipa::path(
    get,
    path = "/tasks/stats",
    tag = "tasks",
    responses(
        (status = 200, description = "Task statistics", body = crate::types::TaskStats)
    )
)]
pub async fn task_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.stats())
}

/// GET /tasks/:id - Get single task
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID (UUID)")
    ),
    responses(
        (status = 200, description = "Task record", body = crate::types::TaskRecord),
        (status = 400, description = "Malformed task ID", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError)
    )
)]
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_task_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.manager.get(&id) {
        Some(task) => (StatusCode::OK, Json(task)).into_response(),
        None => Error::NotFound(id.to_string()).into_response(),
    }
}

/// POST /tasks/:id/cancel - Cancel a pending or running task
#[utoipa::path(
    post,
    path = "/tasks/{id}/cancel",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID (UUID)")
    ),
    responses(
        (status = 200, description = "Cancellation signalled", body = CancelTaskResponse),
        (status = 400, description = "Malformed task ID", body = ApiError),
        (status = 409, description = "Task unknown or already finished", body = ApiError)
    )
)]
pub async fn cancel_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_task_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if state.manager.cancel(&id) {
        (StatusCode::OK, Json(CancelTaskResponse { cancelled: true })).into_response()
    } else {
        api_error_response(
            StatusCode::CONFLICT,
            ApiError::with_details(
                "cannot_cancel",
                "task does not exist or has already finished",
                serde_json::json!({ "task_id": id }),
            ),
        )
    }
}

/// POST /tasks/clear-cancelled - Remove cancelled tasks
#[utoipa::path(
    post,
    path = "/tasks/clear-cancelled",
    tag = "tasks",
    responses(
        (status = 200, description = "Summary of the removed tasks", body = crate::types::ClearCancelledReport)
    )
)]
pub async fn clear_cancelled(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.clear_cancelled())
}

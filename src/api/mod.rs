//! REST API server module
//!
//! Exposes the task manager over HTTP: listing and inspecting tasks,
//! cancelling them, clearing cancelled records, and a server-sent events
//! stream of task updates.

use crate::{Config, Result, TaskManager};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks
/// - `GET /tasks` - List all tasks
/// - `GET /tasks/stats` - Task counts per status
/// - `GET /tasks/:id` - Get single task
/// - `POST /tasks/:id/cancel` - Cancel a pending or running task
/// - `POST /tasks/clear-cancelled` - Remove cancelled tasks
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /events` - Server-sent events stream of task updates
pub fn create_router(manager: TaskManager, config: Arc<Config>) -> Router {
    let state = AppState::new(manager, config.clone());

    let router = Router::new()
        // Tasks
        .route("/tasks", get(routes::list_tasks))
        .route("/tasks/stats", get(routes::task_stats))
        .route("/tasks/clear-cancelled", post(routes::clear_cancelled))
        .route("/tasks/:id", get(routes::get_task))
        .route("/tasks/:id/cancel", post(routes::cancel_task))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins that parse as header values are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    let cors = if allow_any || origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
    };

    cors.allow_methods(Any).allow_headers(Any)
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops or fails.
///
/// # Example
///
/// ```no_run
/// use music_dl_tasks::{Config, TaskManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let manager = TaskManager::new((*config).clone())?;
/// manager.start().await?;
///
/// music_dl_tasks::api::start_api_server(manager, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: TaskManager, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(manager, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

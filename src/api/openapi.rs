//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the music-dl-tasks REST API
///
/// Served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "music-dl-tasks REST API",
        version = "0.1.0",
        description = "Inspect, cancel and monitor background music download tasks"
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::list_tasks,
        crate::api::routes::task_stats,
        crate::api::routes::get_task,
        crate::api::routes::cancel_task,
        crate::api::routes::clear_cancelled,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::TaskRecord,
        crate::types::TaskStats,
        crate::types::ClearedTask,
        crate::types::ClearCancelledReport,
        crate::types::Event,
        crate::config::Config,
        crate::config::ApiConfig,
        crate::api::routes::CancelTaskResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Background tasks - List, inspect, cancel and clear tasks"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;

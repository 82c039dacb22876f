use super::*;
use crate::manager::test_helpers::{create_test_manager, sleep_then, submit, wait_for_status};
use crate::types::{TaskRecord, TaskStatus};
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;

mod system;

/// Router over a fresh manager (pool not started)
fn test_app() -> (TaskManager, Router) {
    let manager = create_test_manager(1);
    let app = create_router(manager.clone(), manager.get_config());
    (manager, app)
}

async fn send(app: Router, method: &str, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let mut config = Config::default();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let manager = TaskManager::new(config).unwrap();

    let api_handle = manager.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!api_handle.is_finished(), "server should still be serving");
    api_handle.abort();
}

#[tokio::test]
async fn test_api_server_reports_bind_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = Config::default();
    config.api.bind_address = listener.local_addr().unwrap();
    let config = Arc::new(config);
    let manager = TaskManager::new((*config).clone()).unwrap();

    let result = start_api_server(manager, config).await;
    assert!(matches!(result, Err(crate::Error::Io(_))));
}

#[tokio::test]
async fn test_cors_enabled() {
    let (_manager, app) = test_app();

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let mut config = Config::default();
    config.api.cors_origins = vec!["http://player.local".to_string()];
    let config = Arc::new(config);
    let manager = TaskManager::new((*config).clone()).unwrap();
    let app = create_router(manager, config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://player.local")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://player.local"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let mut config = Config::default();
    config.api.cors_enabled = false;
    let config = Arc::new(config);
    let manager = TaskManager::new((*config).clone()).unwrap();
    let app = create_router(manager, config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

use super::*;
use futures::StreamExt;

#[tokio::test]
async fn test_health_check() {
    let (manager, app) = test_app();

    let response = send(app.clone(), "GET", "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["workers_running"], false);
    assert_eq!(body["accepting_tasks"], true);

    manager.start().await.unwrap();
    let body = body_json(send(app, "GET", "/health").await).await;
    assert_eq!(body["workers_running"], true);

    manager.stop().await;
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (_manager, app) = test_app();

    let response = send(app, "GET", "/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["openapi"].as_str().unwrap().starts_with("3."));
    assert!(body["paths"]["/tasks/{id}/cancel"].is_object());
}

#[tokio::test]
async fn test_sse_event_stream_pushes_task_updates() {
    let (manager, app) = test_app();

    let response = send(app, "GET", "/events").await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(content_type.contains("text/event-stream"), "got {content_type}");

    let id = submit(&manager, "song", sleep_then(1, json!(1)));

    let mut stream = response.into_body().into_data_stream();
    let mut received = String::new();
    while !received.contains("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(received.contains("event: task_updated"), "got {received}");
    assert!(received.contains(&id.to_string()));
    assert!(received.contains("\"status\":\"pending\""));
}

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use futures::StreamExt;

use common::app::spawn_test_server;
use common::http::{call, request};

#[tokio::test]
async fn it_sse_endpoint_is_reachable() {
    let app = spawn_test_server().await;

    let response = request(&app.app, Method::GET, "/api/events", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(content_type.contains("text/event-stream"));
}

#[tokio::test]
async fn it_sse_streams_attempt_events_for_filtered_user() {
    let app = spawn_test_server().await;

    let response = request(&app.app, Method::GET, "/api/events?userId=alice", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut frames = response.into_body().into_data_stream();

    // 其他用户的事件应被过滤
    let (status, _) = call(
        &app.app,
        Method::POST,
        "/api/users/bob/attempts",
        Some(serde_json::json!({ "word": "pear", "isCorrect": true, "responseTime": 2.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app.app,
        Method::POST,
        "/api/users/alice/attempts",
        Some(serde_json::json!({ "word": "apple", "isCorrect": true, "responseTime": 2.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .expect("event within timeout")
        .expect("stream open")
        .expect("frame bytes");
    let text = String::from_utf8(frame.to_vec()).unwrap();

    assert!(text.contains("event: attempt_recorded"), "frame: {text}");
    assert!(text.contains("\"word\":\"apple\""), "frame: {text}");
    assert!(!text.contains("pear"));
}

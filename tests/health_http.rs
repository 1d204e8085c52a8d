mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_server;
use common::http::{call, request};

#[tokio::test]
async fn it_health_live() {
    let app = spawn_test_server().await;

    let live = request(&app.app, Method::GET, "/health/live", None).await;
    assert_eq!(live.status(), StatusCode::OK);
}

#[tokio::test]
async fn it_health_reports_store_and_schema() {
    let app = spawn_test_server().await;

    let (status, body) = call(&app.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"]["healthy"], true);
    assert_eq!(
        body["store"]["schemaVersion"],
        adaptive_mastery::store::migrate::latest_version()
    );
}

#[tokio::test]
async fn it_unknown_route_is_json_404() {
    let app = spawn_test_server().await;

    let (status, body) = call(&app.app, Method::GET, "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    common::http::assert_json_error(&body, "NOT_FOUND");
}

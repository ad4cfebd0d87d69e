use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use docqueue::api::{AppState, build_router, build_state};
use docqueue::config::Config;
use docqueue::extract::{ExtractError, ExtractionRequest, Extractor};

struct EchoExtractor;

#[async_trait]
impl Extractor for EchoExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Value, ExtractError> {
        Ok(json!({ "filename": request.filename }))
    }
}

/// Builds a test app over stores in a fresh temp directory
fn build_test_app() -> (Router, AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let mut config = Config::default();
    config.server.data_dir = temp_dir.path().join("data");
    config.download.folder = temp_dir.path().join("documents");

    let state = build_state(config, Arc::new(EchoExtractor)).expect("Failed to build state");
    let app = build_router(state.clone());

    (app, state, temp_dir)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_status_on_empty_queue() {
    let (app, _state, _temp_dir) = build_test_app();

    let (status, body) = send(&app, get("/api/queue/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["queue_status"]["total"], 0);
    assert_eq!(body["queue_status"]["completion_rate"], 0.0);
    assert_eq!(body["queue_status"]["is_processing"], false);
}

#[tokio::test]
async fn test_control_noops_succeed() {
    let (app, _state, _temp_dir) = build_test_app();

    for uri in ["/api/queue/stop", "/api/queue/pause", "/api/queue/reset"] {
        let (status, body) = send(&app, post_empty(uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["success"], true);
        assert_eq!(body["changed"], false);
    }

    let (status, body) = send(&app, post_empty("/api/queue/retry-failed")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requeued_count"], 0);
}

#[tokio::test]
async fn test_test_mode_enqueue_conflicts_while_running() {
    let (app, state, _temp_dir) = build_test_app();

    let (status, body) = send(&app, post_empty("/api/queue/start")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (status, body) = send(
        &app,
        post_json(
            "/api/queue/enqueue",
            json!({ "test_mode": true, "test_limit": 5, "clear_existing": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "POOL_RUNNING");

    // Full enqueue is still allowed while running
    let (status, body) = send(&app, post_empty("/api/queue/enqueue")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued_count"], 0);

    state.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_clear_requires_a_flag() {
    let (app, _state, _temp_dir) = build_test_app();

    let (status, body) = send(&app, post_empty("/api/queue/clear")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYLOAD");

    let (status, body) = send(&app, post_json("/api/queue/clear", json!({ "clear_all": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed_count"], 0);
}

#[tokio::test]
async fn test_rejects_non_json_content_type() {
    let (app, _state, _temp_dir) = build_test_app();

    let request = Request::builder()
        .uri("/api/queue/clear")
        .method("POST")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"clear_all": true}"#))
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_contracts_and_list_documents() {
    let (app, _state, _temp_dir) = build_test_app();

    let payload = json!({
        "contracts": [{
            "notice_id": "W912DY-24-R-0001",
            "title": "Barracks renovation",
            "resource_links": [
                "https://sam.gov/api/files/sow.pdf",
                { "url": "https://sam.gov/api/files/drawings.zip", "description": "Drawings" },
                "https://sam.gov/api/files/sow.pdf",
                "ftp://legacy.example.com/file.doc",
                "  "
            ]
        }]
    });

    let (status, body) = send(&app, post_json("/api/contracts", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported_count"], 1);

    let (status, body) = send(&app, get("/api/contracts/W912DY-24-R-0001/documents")).await;
    assert_eq!(status, StatusCode::OK);

    let documents = body["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["filename"], "sow.pdf");
    assert_eq!(documents[0]["extension"], ".pdf");
    assert_eq!(documents[0]["is_downloaded"], false);
    assert_eq!(documents[1]["description"], "Drawings");

    let (status, body) = send(&app, get("/api/contracts/UNKNOWN/documents")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_import_rejects_duplicate_notice_ids() {
    let (app, _state, _temp_dir) = build_test_app();

    let payload = json!({
        "contracts": [
            { "notice_id": "N-1" },
            { "notice_id": "N-1" }
        ]
    });

    let (status, body) = send(&app, post_json("/api/contracts", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_items_endpoints() {
    let (app, _state, _temp_dir) = build_test_app();

    let (status, body) = send(&app, get("/api/queue/items/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(&app, get("/api/queue/items?status=failed&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, _) = send(&app, get("/api/queue/items?status=exploded")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_all_validates_options() {
    let (app, _state, _temp_dir) = build_test_app();

    let (status, _) = send(
        &app,
        post_json("/api/documents/download-all", json!({ "concurrency": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(
            "/api/documents/download-all",
            json!({ "download_folder": "../outside" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        post_json("/api/documents/download-all", json!({ "contract_id": "MISSING" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    // Empty catalog: nothing attempted
    let (status, body) = send(&app, post_empty("/api/documents/download-all")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["attempted"], 0);
    assert_eq!(body["summary"]["skipped"], 0);
}

#[tokio::test]
async fn test_health_reports_components() {
    let (app, _state, _temp_dir) = build_test_app();

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["queue_store"], "healthy");
    assert_eq!(body["components"]["worker_pool"], "stopped");
}

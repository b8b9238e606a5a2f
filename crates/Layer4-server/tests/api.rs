//! Router tests driven through `tower::ServiceExt::oneshot`

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use lingo_foundation::LingoConfig;
use lingo_provider::ScriptedProvider;
use lingo_server::{build_router, fixed_provider, AppState, TaskRunner};
use lingo_task::TaskStore;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

const FINISHES: [&str; 3] = ["Finish: lesson checked", "Finish: lesson checked", "Finish: lesson checked"];

fn app(dir: &Path, provider: ScriptedProvider) -> Router {
    let mut config = LingoConfig::default();
    config.tools.workspace_root = Some(dir.to_path_buf());
    let store = TaskStore::new(dir.join("tasks"));
    let runner = TaskRunner::new(&config, store, fixed_provider(Arc::new(provider))).unwrap();
    build_router(AppState::new(runner))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, prompt: &str) -> String {
    let (status, body) = send(app, "POST", "/api/tasks", Some(json!({"prompt": prompt}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn wait_terminal(app: &Router, id: &str) -> Value {
    for _ in 0..300 {
        let (status, body) = send(app, "GET", &format!("/api/tasks/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] != "running" {
            // 레코드가 끝난 뒤 러너 맵에서 빠질 때까지 잠깐 기다림
            tokio::time::sleep(Duration::from_millis(20)).await;
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} never finished", id);
}

#[tokio::test]
async fn test_health() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), ScriptedProvider::new(FINISHES));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_runs_task_to_completion() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), ScriptedProvider::new(FINISHES));

    let id = create(&app, "Check lesson 3 for typos").await;
    let record = wait_terminal(&app, &id).await;
    assert_eq!(record["status"], "complete");
    assert_eq!(record["iterations"], 3);
    assert_eq!(record["result"]["summary"], "lesson checked");

    let (status, list) = send(&app, "GET", "/api/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], id.as_str());
    assert!(list[0].get("events").is_none());
}

#[tokio::test]
async fn test_create_with_config_override() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), ScriptedProvider::new(Vec::<String>::new()));

    let (status, body) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(json!({"prompt": "Translate unit 4", "config": {"maxIterations": 7}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["config"]["maxIterations"], 7);
}

#[tokio::test]
async fn test_empty_prompt_is_bad_request() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), ScriptedProvider::new(FINISHES));
    let (status, body) = send(&app, "POST", "/api/tasks", Some(json!({"prompt": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), ScriptedProvider::new(FINISHES));

    let missing = "0b9c2a9e-4c8f-4d55-9a52-1f2f3c4d5e6f";
    let (status, body) = send(&app, "GET", &format!("/api/tasks/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(&app, "GET", "/api/tasks/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", &format!("/api/tasks/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_running_then_conflict() {
    let dir = tempdir().unwrap();
    let provider =
        ScriptedProvider::new(FINISHES).with_delay(Duration::from_millis(300));
    let app = app(dir.path(), provider);

    let id = create(&app, "Slow lesson review").await;
    let (status, body) = send(&app, "POST", &format!("/api/tasks/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "cancelling");

    let record = wait_terminal(&app, &id).await;
    assert_eq!(record["status"], "cancelled");

    let (status, body) = send(&app, "POST", &format!("/api/tasks/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_retry_conflict_while_running_and_created_after() {
    let dir = tempdir().unwrap();
    let provider =
        ScriptedProvider::new(Vec::<String>::new()).with_delay(Duration::from_millis(200));
    let app = app(dir.path(), provider);

    let id = create(&app, "Quiz for unit 2").await;
    let (status, _) = send(&app, "POST", &format!("/api/tasks/{}/retry", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let record = wait_terminal(&app, &id).await;
    assert_eq!(record["status"], "failed");

    let (status, retried) = send(&app, "POST", &format!("/api/tasks/{}/retry", id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(retried["id"], id.as_str());
    assert_eq!(retried["prompt"], "Quiz for unit 2");

    let new_id = retried["id"].as_str().unwrap().to_string();
    wait_terminal(&app, &new_id).await;
}

#[tokio::test]
async fn test_delete_removes_record() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), ScriptedProvider::new(FINISHES));

    let id = create(&app, "Remove me").await;
    wait_terminal(&app, &id).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/tasks/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/tasks/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_events_replay_for_finished_task() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), ScriptedProvider::new(FINISHES));

    let id = create(&app, "Replay events").await;
    wait_terminal(&app, &id).await;

    let request = Request::builder()
        .uri(format!("/api/tasks/{}/events", id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = tokio::time::timeout(
        Duration::from_secs(5),
        to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .unwrap()
    .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("event: start"));
    assert!(text.contains("event: iteration"));
    assert!(text.contains("event: complete"));
}

#[tokio::test]
async fn test_events_stream_live_until_terminal() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new(FINISHES).with_delay(Duration::from_millis(50));
    let app = app(dir.path(), provider);

    let id = create(&app, "Stream me").await;
    let request = Request::builder()
        .uri(format!("/api/tasks/{}/events", id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    let bytes = tokio::time::timeout(
        Duration::from_secs(5),
        to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .unwrap()
    .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.matches("event: start").count(), 1);
    assert_eq!(text.matches("event: complete").count(), 1);
    assert_eq!(text.matches("event: iteration").count(), 3);
}

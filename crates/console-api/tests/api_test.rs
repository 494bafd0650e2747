use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use console_api::{
    build_router,
    config::{Config, CorsConfig, LoggingConfig, ServerConfig, StorageConfig},
    state::AppState,
};
use console_persist::ConsoleClient;

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 5,
        },
        cors: CorsConfig {
            enabled: true,
            origins: vec!["*".to_string()],
        },
        storage: StorageConfig {
            backend: "memory".to_string(),
            database: "console_test".to_string(),
            transactions: false,
            retry_attempts: 3,
            reconcile_interval_secs: 0,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        mongodb_uri: String::new(),
    }
}

fn app() -> Router {
    build_router(Arc::new(AppState::new(
        test_config(),
        ConsoleClient::in_memory(),
    )))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_project(app: &Router, slug: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/projects",
        Some(json!({ "name": "AI Console", "slug": slug, "externalSystemRef": slug })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

async fn create_thread(app: &Router, project_id: &str, title: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/threads",
        Some(json!({ "projectId": project_id, "title": title })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["services"]["storage"], "connected");
}

#[tokio::test]
async fn test_message_flow_updates_thread() {
    let app = app();
    let project = create_project(&app, "ai-console").await;
    let thread = create_thread(&app, project["id"].as_str().unwrap(), "Getting Started").await;
    let thread_id = thread["id"].as_str().unwrap();

    assert_eq!(
        thread["externalRef"],
        format!("ai-console:thread:{}", thread_id)
    );
    assert_eq!(thread["lastMessageAt"], Value::Null);

    let (status, body) = send(
        &app,
        "POST",
        "/api/messages",
        Some(json!({ "threadId": thread_id, "role": "user", "content": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created_at = body["data"]["createdAt"].clone();

    let (status, body) = send(&app, "GET", &format!("/api/threads/{}", thread_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lastMessageAt"], created_at);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/threads/{}/messages", thread_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["data"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "Hello");
    assert_eq!(messages[0]["role"], "user");
}

#[tokio::test]
async fn test_invalid_role_is_bad_request() {
    let app = app();
    let project = create_project(&app, "p").await;
    let thread = create_thread(&app, project["id"].as_str().unwrap(), "t").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/messages",
        Some(json!({ "threadId": thread["id"], "role": "moderator", "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("moderator"));
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/projects",
        Some(json!({ "name": "No slug" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("slug"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/projects")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_slug_is_conflict() {
    let app = app();
    create_project(&app, "ai-console").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/projects",
        Some(json!({ "name": "Again", "slug": "ai-console", "externalSystemRef": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, body) = send(&app, "GET", "/api/projects", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = app();

    let (status, _) = send(&app, "GET", "/api/threads/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/projects/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/threads",
        Some(json!({ "projectId": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/projects/missing/threads", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_delete_project_cascades() {
    let app = app();
    let project = create_project(&app, "doomed").await;
    let project_id = project["id"].as_str().unwrap();
    let thread = create_thread(&app, project_id, "t").await;
    let thread_id = thread["id"].as_str().unwrap();
    send(
        &app,
        "POST",
        "/api/messages",
        Some(json!({ "threadId": thread_id, "role": "user", "content": "bye" })),
    )
    .await;

    let (status, _) = send(&app, "DELETE", &format!("/api/projects/{}", project_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/threads/{}", thread_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/threads/{}/messages", thread_id),
        None,
    )
    .await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_patch_thread_and_lookup_by_external_ref() {
    let app = app();
    let project = create_project(&app, "refs").await;
    let thread = create_thread(&app, project["id"].as_str().unwrap(), "Draft").await;
    let thread_id = thread["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/threads/{}", thread_id),
        Some(json!({ "title": "Final", "isPinned": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Final");
    assert_eq!(body["data"]["isPinned"], true);
    assert_eq!(body["data"]["externalRef"], thread["externalRef"]);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/external-refs/{}", thread["externalRef"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], thread_id);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/threads/{}", thread_id),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_project() {
    let app = app();
    let project = create_project(&app, "p").await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/projects/{}", project["id"].as_str().unwrap()),
        Some(json!({ "name": "Renamed", "color": "#ffffff" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["color"], "#ffffff");
    assert_eq!(body["data"]["slug"], "p");
}

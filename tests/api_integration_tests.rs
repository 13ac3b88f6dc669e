//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each admin endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mini_cache::{api::create_router, AppState, CacheConfig, CacheEngine};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_app(CacheConfig {
        max_size: 64 * 1024,
        max_entries: 100,
        ..CacheConfig::default()
    })
}

fn create_app(config: CacheConfig) -> Router {
    create_router(AppState::new(CacheEngine::new(config)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn set(app: &Router, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", "/set", Some(body.to_string())).await
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/set")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"key":"test_key","value":"test_value"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "test_key");
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_with_options_is_visible_on_get() {
    let app = create_test_app();

    let (status, _) = set(
        &app,
        serde_json::json!({
            "key": "user:1",
            "value": {"name": "ada", "langs": ["rust"]},
            "ttl": 60,
            "priority": "high",
            "metadata": {"source": "import"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", "/get/user:1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"]["name"], "ada");
    assert_eq!(json["priority"], "high");
    assert_eq!(json["metadata"]["source"], "import");
    assert_eq!(json["access_count"], 1);
}

#[tokio::test]
async fn test_set_empty_key_is_bad_request() {
    let app = create_test_app();

    let (status, json) = set(&app, serde_json::json!({"key": "", "value": "v"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_set_key_too_long_is_bad_request() {
    let app = create_test_app();

    let (status, _) = set(&app, serde_json::json!({"key": "k".repeat(257), "value": "v"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_oversized_value_is_unavailable() {
    let app = create_app(CacheConfig {
        max_size: 128,
        ..CacheConfig::default()
    });

    let (status, json) = set(&app, serde_json::json!({"key": "big", "value": "x".repeat(500)})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].as_str().unwrap().contains("Capacity exceeded"));
}

#[tokio::test]
async fn test_set_malformed_json() {
    let app = create_test_app();

    let (status, _) = send(&app, "PUT", "/set", Some("{not json".to_string())).await;
    assert!(status.is_client_error());
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_not_found() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/get/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_get_after_ttl_expires() {
    let app = create_test_app();

    set(&app, serde_json::json!({"key": "short", "value": "v", "ttl": 1})).await;
    let (status, _) = send(&app, "GET", "/get/short", None).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let (status, _) = send(&app, "GET", "/get/short", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["entry_count"], 0);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_existing_then_missing() {
    let app = create_test_app();
    set(&app, serde_json::json!({"key": "gone", "value": "v"})).await;

    let (status, json) = send(&app, "DELETE", "/del/gone", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "gone");

    let (status, _) = send(&app, "DELETE", "/del/gone", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == CLEAR Endpoint Tests ==

#[tokio::test]
async fn test_clear_empties_cache() {
    let app = create_test_app();
    for key in ["a", "b", "c"] {
        set(&app, serde_json::json!({"key": key, "value": key})).await;
    }

    let (status, _) = send(&app, "POST", "/clear", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["entry_count"], 0);
    assert_eq!(stats["total_size"], 0);
}

// == STATS Endpoint Tests ==

#[tokio::test]
async fn test_stats_track_hits_misses_and_evictions() {
    let app = create_app(CacheConfig {
        max_entries: 2,
        ..CacheConfig::default()
    });

    for key in ["a", "b", "c"] {
        set(&app, serde_json::json!({"key": key, "value": "v"})).await;
    }
    send(&app, "GET", "/get/b", None).await;
    send(&app, "GET", "/get/a", None).await;

    let (status, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["hit_ratio"], 0.5);
    assert_eq!(stats["evictions"], 1);
    assert_eq!(stats["entry_count"], 2);
    assert_eq!(stats["max_entries"], 2);
}

// == EXPORT / IMPORT Endpoint Tests ==

#[tokio::test]
async fn test_export_import_between_instances() {
    let source = create_test_app();
    set(&source, serde_json::json!({"key": "k1", "value": "one"})).await;
    set(&source, serde_json::json!({"key": "k2", "value": [1, 2, 3]})).await;

    let (status, snapshot) = send(&source, "GET", "/export", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["version"], 1);
    assert_eq!(snapshot["entries"].as_array().unwrap().len(), 2);

    let target = create_test_app();
    let (status, json) = send(&target, "POST", "/import", Some(snapshot.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);

    let (_, k2) = send(&target, "GET", "/get/k2", None).await;
    assert_eq!(k2["value"], serde_json::json!([1, 2, 3]));
}

#[tokio::test]
async fn test_import_rejects_unknown_version() {
    let app = create_test_app();
    let (_, mut snapshot) = send(&app, "GET", "/export", None).await;
    snapshot["version"] = serde_json::json!(99);

    let (status, _) = send(&app, "POST", "/import", Some(snapshot.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_test_app();

    let (status, _) = send(&app, "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//! End-to-end tests for the store / retrieve / discard routes.
//!
//! Requests go through the full router (CORS, timeout and trace layers
//! included) with `tower::ServiceExt::oneshot`; no socket is opened.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use handoff::config::DurableConfig;
use handoff::routes;
use handoff::state::AppState;
use handoff::store::{BackendKind, TokenStore};

fn app_with(store: TokenStore) -> Router {
    routes::app(AppState::new(Arc::new(store)), Duration::from_secs(5))
}

fn in_memory_app() -> Router {
    app_with(TokenStore::in_memory())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn store_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/store-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn retrieve_request(key: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/temp-token/{}", key))
        .body(Body::empty())
        .unwrap()
}

// ============================================================================
// STORE + RETRIEVE
// ============================================================================

#[tokio::test]
async fn test_store_then_retrieve() {
    let app = in_memory_app();

    let (status, body) = send_json(
        &app,
        store_request(json!({ "key": "abc123", "token": "tok-xyz" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["key"], "abc123");
    assert!(body["expires_at"].is_string());

    let (status, body) = send_json(&app, retrieve_request("abc123")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["token"], "tok-xyz");
}

#[tokio::test]
async fn test_store_accepts_hash_field() {
    let app = in_memory_app();

    let (status, body) = send_json(
        &app,
        store_request(json!({ "hash": "abc123_1700000000", "token": "tok" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "abc123_1700000000");

    let (status, _) = send_json(&app, retrieve_request("abc123_1700000000")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_retrieve_key_may_contain_slashes() {
    let app = in_memory_app();

    send_json(&app, store_request(json!({ "key": "a/b/c", "token": "nested" }))).await;

    let (status, body) = send_json(&app, retrieve_request("a/b/c")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], "nested");
}

#[tokio::test]
async fn test_second_store_overwrites_first() {
    let app = in_memory_app();

    send_json(&app, store_request(json!({ "key": "k", "token": "t1" }))).await;
    send_json(&app, store_request(json!({ "key": "k", "token": "t2" }))).await;

    let (_, body) = send_json(&app, retrieve_request("k")).await;
    assert_eq!(body["token"], "t2");
}

// ============================================================================
// NOT FOUND / INVALID INPUT
// ============================================================================

#[tokio::test]
async fn test_retrieve_unknown_key_is_404() {
    let app = in_memory_app();

    let (status, body) = send_json(&app, retrieve_request("never-stored")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Token not found or expired");
}

#[tokio::test]
async fn test_retrieve_without_key_is_404() {
    let app = in_memory_app();

    let (status, _) = send(&app, retrieve_request("")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_rejects_missing_or_empty_fields() {
    let app = in_memory_app();

    for body in [
        json!({ "token": "tok" }),
        json!({ "key": "abc123" }),
        json!({ "key": "", "token": "tok" }),
        json!({ "key": "abc123", "token": "" }),
    ] {
        let (status, response) = send_json(&app, store_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["success"], false);
    }

    // Nothing was staged under the key that appeared in a rejected request
    let (status, _) = send_json(&app, retrieve_request("abc123")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unreadable_store_body_is_json_400() {
    let app = in_memory_app();

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/store-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let wrong_type = store_request(json!({ "key": "abc123", "token": 5 }));
    let no_content_type = Request::builder()
        .method(Method::POST)
        .uri("/store-token")
        .body(Body::from(json!({ "key": "abc123", "token": "tok" }).to_string()))
        .unwrap();

    for request in [malformed, wrong_type, no_content_type] {
        let (status, body) = send_json(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    let (status, _) = send_json(&app, retrieve_request("abc123")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let app = in_memory_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/store-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/temp-token/abc123")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

// ============================================================================
// DISCARD
// ============================================================================

#[tokio::test]
async fn test_discard_removes_token() {
    let app = in_memory_app();
    send_json(&app, store_request(json!({ "key": "k", "token": "tok" }))).await;

    let discard = || {
        Request::builder()
            .method(Method::DELETE)
            .uri("/temp-token/k")
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app, discard()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, discard()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_json(&app, retrieve_request("k")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
async fn test_cors_preflight() {
    let app = in_memory_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/store-token")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));
    assert!(methods.contains("GET"));
}

#[tokio::test]
async fn test_cors_header_on_simple_response() {
    let app = in_memory_app();

    let request = Request::builder()
        .uri("/temp-token/missing")
        .header(header::ORIGIN, "https://app.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

// ============================================================================
// BACKEND FAILURE
// ============================================================================

#[tokio::test]
async fn test_backend_failure_is_500_not_404() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad apikey"))
        .mount(&mock_server)
        .await;

    let config = DurableConfig {
        url: Some(mock_server.uri()),
        key: Some("test-key".into()),
        ..DurableConfig::default()
    };
    let store = TokenStore::from_config(&config).unwrap();
    assert_eq!(store.backend_kind(), BackendKind::Durable);
    let app = app_with(store);

    let (status, body) = send_json(&app, retrieve_request("abc123")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Storage backend unavailable");

    let (status, _) = send_json(
        &app,
        store_request(json!({ "key": "abc123", "token": "tok" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_slow_backend_hits_request_deadline() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let config = DurableConfig {
        url: Some(mock_server.uri()),
        key: Some("test-key".into()),
        ..DurableConfig::default()
    };
    let store = TokenStore::from_config(&config).unwrap();
    let app = routes::app(AppState::new(Arc::new(store)), Duration::from_secs(1));

    let (status, _) = send(&app, retrieve_request("abc123")).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}

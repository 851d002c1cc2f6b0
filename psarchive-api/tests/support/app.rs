use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use psarchive_api::{create_router, AppState, AuthState};
use psarchive_storage::InMemoryMetricStore;
use serde_json::Value;
use tower::ServiceExt;

pub const TOKEN: &str = "test-token";

/// Router over a fresh in-memory store, plus a handle on that store.
pub fn test_app() -> (Router, InMemoryMetricStore) {
    test_app_with_token(TOKEN)
}

pub fn test_app_with_token(token: &str) -> (Router, InMemoryMetricStore) {
    let store = InMemoryMetricStore::new();
    let state = AppState::new(Arc::new(store.clone()), AuthState::new(token));
    (create_router(state), store)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request and decode the JSON response body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

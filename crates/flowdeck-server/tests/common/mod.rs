//! Shared helpers for server integration tests.
#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, header::AUTHORIZATION},
    response::Response,
};
use serde_json::Value;
use tempfile::TempDir;

use flowdeck_policy::{EvaluatorConfig, PolicyEvaluator};
use flowdeck_server::{AppState, Server, ServerConfig};
use flowdeck_store::WorkflowStore;

/// Build a router backed by an in-memory store and a temp evaluator cache.
pub fn test_app(config: ServerConfig) -> (Router, TempDir) {
    let tmp = TempDir::new().unwrap();
    let store = WorkflowStore::open_in_memory().unwrap();
    let evaluator = PolicyEvaluator::new(EvaluatorConfig::new(tmp.path().join("cache"))).unwrap();
    let state = AppState::new(store, evaluator, config);
    (Server::from_state(state).router(), tmp)
}

/// Router with auth and rate limiting disabled.
pub fn open_app() -> (Router, TempDir) {
    test_app(ServerConfig::new(None).with_rate_limiting(false))
}

/// Build a JSON request.
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a bodyless request.
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a bodyless request with a bearer token.
pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A minimal valid workflow request body.
pub fn sample_workflow(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "description": "integration fixture",
        "nodes": [
            { "id": "start", "config": { "type": "start" } },
            { "id": "approve", "config": { "type": "approval",
              "approvers": ["alice", "bob"],
              "strategy": { "mode": "quorum", "count": 2 } } },
            { "id": "end", "config": { "type": "end" } }
        ],
        "edges": [
            { "from": "start", "to": "approve" },
            { "from": "approve", "to": "end" }
        ],
        "trigger": { "type": "manual" }
    })
}

//! Integration tests for workflow and job routes.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use common::{authed_request, body_json, empty_request, json_request, open_app, sample_workflow, test_app};
use flowdeck_server::ServerConfig;

#[tokio::test]
async fn test_workflow_crud_roundtrip() {
    let (app, _tmp) = open_app();

    // Create
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/workflows",
            sample_workflow("expense"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "expense");
    assert_eq!(created["nodes"].as_array().unwrap().len(), 3);

    // Get
    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/v1/workflows/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["id"], id.as_str());

    // List
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/workflows"))
        .await
        .unwrap();
    let listing = body_json(response).await;
    assert_eq!(listing["workflows"].as_array().unwrap().len(), 1);

    // Update
    let mut updated = sample_workflow("expense-v2");
    updated["description"] = json!("updated");
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/workflows/{id}"),
            updated,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "expense-v2");

    // Delete
    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/v1/workflows/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(empty_request("GET", &format!("/api/v1/workflows/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_rejects_invalid_document() {
    let (app, _tmp) = open_app();

    // Two start nodes
    let body = json!({
        "name": "broken",
        "nodes": [
            { "id": "a", "config": { "type": "start" } },
            { "id": "b", "config": { "type": "start" } },
            { "id": "end", "config": { "type": "end" } }
        ],
        "edges": [
            { "from": "a", "to": "end" },
            { "from": "b", "to": "end" }
        ]
    });
    let response = app
        .oneshot(json_request("POST", "/api/v1/workflows", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert!(
        error["message"]
            .as_str()
            .unwrap()
            .contains("exactly one start node")
    );
}

#[tokio::test]
async fn test_update_missing_workflow_is_404() {
    let (app, _tmp) = open_app();
    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/v1/workflows/ghost",
            sample_workflow("ghost"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trigger_and_cancel_job() {
    let (app, _tmp) = open_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/workflows",
            sample_workflow("jobs"),
        ))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    // Trigger
    let response = app
        .clone()
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/workflows/{id}/trigger"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let job = body_json(response).await;
    assert_eq!(job["status"], "queued");
    assert_eq!(job["trigger"], "manual");
    let job_id = job["id"].as_str().unwrap().to_string();

    // Listed under the workflow
    let response = app
        .clone()
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/jobs?workflow_id={id}"),
        ))
        .await
        .unwrap();
    let listing = body_json(response).await;
    assert_eq!(listing["jobs"].as_array().unwrap().len(), 1);

    // Cancel
    let response = app
        .clone()
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/jobs/{job_id}/cancel"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = body_json(response).await;
    assert_eq!(cancelled["status"], "cancelled");

    // Cancelling a finished job is a client error
    let response = app
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/jobs/{job_id}/cancel"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trigger_missing_workflow_is_404() {
    let (app, _tmp) = open_app();
    let response = app
        .oneshot(empty_request("POST", "/api/v1/workflows/ghost/trigger"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bearer_token_grants_access() {
    let (app, _tmp) = test_app(
        ServerConfig::new(Some("secret".into())).with_rate_limiting(false),
    );

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/workflows"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(authed_request("GET", "/api/v1/workflows", "secret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_missing_job_is_404() {
    let (app, _tmp) = open_app();
    let response = app
        .oneshot(empty_request("GET", "/api/v1/jobs/ghost"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

//! Integration tests for the policy test endpoint.

mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{body_json, json_request, open_app};

const LIMIT_SCRIPT: &str = r#"
use serde_json::Value;

fn validateSOD(user: &Value, action: &Value, _context: &Value) -> Result<Verdict, String> {
    let amount = action["amount"].as_f64().unwrap_or(0.0);
    let limit = user["approvalLimit"].as_f64().unwrap_or(0.0);
    if amount > limit {
        return Ok(Verdict::reject("over limit"));
    }
    Ok(Verdict::approve())
}
"#;

/// True when the outcome reports a missing WASM toolchain; such tests skip.
fn toolchain_missing(outcome: &Value) -> bool {
    match outcome["error"].as_str() {
        Some(msg)
            if msg.contains("wasm32-wasip1 target is not installed")
                || msg.contains("Failed to invoke cargo")
                || msg.contains("Failed to invoke rustup") =>
        {
            eprintln!("Skipping: WASM toolchain not available ({msg})");
            true
        }
        _ => false,
    }
}

#[tokio::test]
async fn test_missing_code_is_400() {
    let (app, _tmp) = open_app();
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/policy/test",
            json!({ "testUser": {}, "testAction": {} }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert!(error["message"].as_str().unwrap().contains("code"));
}

#[tokio::test]
async fn test_missing_fixtures_are_400() {
    let (app, _tmp) = open_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/policy/test",
            json!({ "code": LIMIT_SCRIPT, "testAction": {} }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/policy/test",
            json!({ "code": LIMIT_SCRIPT, "testUser": {} }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_contract_violation_is_mechanism_failure() {
    let (app, _tmp) = open_app();
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/policy/test",
            json!({
                "code": "fn unrelated() {}",
                "testUser": {},
                "testAction": {}
            }),
        ))
        .await
        .unwrap();

    // Mechanism failures still serialize as a 200 outcome.
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["success"], false);
    assert!(outcome["error"].as_str().unwrap().contains("validateSOD"));
}

#[tokio::test]
async fn test_worked_example_rejects_over_limit() {
    let (app, _tmp) = open_app();
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/policy/test",
            json!({
                "code": LIMIT_SCRIPT,
                "testUser": { "approvalLimit": 100 },
                "testAction": { "amount": 150 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    if toolchain_missing(&outcome) {
        return;
    }

    assert_eq!(
        outcome,
        json!({
            "success": true,
            "result": { "valid": false, "reason": "over limit" }
        })
    );
}

#[tokio::test]
async fn test_context_defaults_to_empty_object() {
    let (app, _tmp) = open_app();
    let script = r#"
use serde_json::Value;
fn validateSOD(_u: &Value, _a: &Value, context: &Value) -> Result<Verdict, String> {
    if context.as_object().map(|o| o.is_empty()) == Some(true) {
        Ok(Verdict::approve())
    } else {
        Ok(Verdict::reject("expected empty context"))
    }
}
"#;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/policy/test",
            json!({ "code": script, "testUser": {}, "testAction": {} }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    if toolchain_missing(&outcome) {
        return;
    }
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["result"]["valid"], true);
}

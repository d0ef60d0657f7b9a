//! The policy test endpoint.
//!
//! The editor's policy panel sends the live-edited script plus designer-typed
//! fixtures here; the response distinguishes "Valid"/"Invalid" (policy-level,
//! `success: true`) from "Error" (mechanism-level, `success: false`).

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;

use flowdeck_policy::{EvaluationInput, EvaluationOutcome};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Request body for `POST /api/v1/policy/test`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTestRequest {
    /// Policy script source.
    #[serde(default)]
    pub code: String,

    /// Test fixture: the acting user.
    pub test_user: Option<Value>,

    /// Test fixture: the attempted action.
    pub test_action: Option<Value>,

    /// Test fixture: additional context. Optional.
    #[serde(default)]
    pub test_context: Option<Value>,
}

/// POST /api/v1/policy/test
///
/// Field presence is checked here so malformed requests are rejected with
/// 400 before anything is compiled. Both outcome shapes serialize as 200 —
/// a failing *mechanism* is still a well-formed answer. The spawned task is
/// the defensive second layer: if evaluation itself panics, the join error
/// maps to a generic 500 instead of tearing down the connection.
pub async fn policy_test_handler(
    State(state): State<AppState>,
    Json(req): Json<PolicyTestRequest>,
) -> Result<Json<EvaluationOutcome>> {
    if req.code.trim().is_empty() {
        return Err(ServerError::BadRequest("'code' is required".into()));
    }
    let Some(user) = req.test_user else {
        return Err(ServerError::BadRequest("'testUser' is required".into()));
    };
    let Some(action) = req.test_action else {
        return Err(ServerError::BadRequest("'testAction' is required".into()));
    };

    let mut input = EvaluationInput::new(req.code, user, action);
    if let Some(context) = req.test_context {
        input = input.with_context(context);
    }

    let evaluator = Arc::clone(&state.evaluator);
    let outcome = tokio::spawn(async move { evaluator.evaluate(&input).await })
        .await
        .map_err(|e| ServerError::Internal(format!("Policy evaluation task failed: {e}")))?;

    Ok(Json(outcome))
}

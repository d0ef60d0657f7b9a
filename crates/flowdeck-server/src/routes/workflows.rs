use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use flowdeck_store::{JobTrigger, WorkflowRecord};
use flowdeck_types::{EdgeDefinition, NodeDefinition, TriggerConfig, WorkflowDocument};

use crate::error::Result;
use crate::routes::jobs::JobResponse;
use crate::state::AppState;

// ── Request/Response types ──────────────────────────────────────────

/// Body for create and update: a document without server-owned fields.
#[derive(Debug, Deserialize)]
pub struct WorkflowRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
    #[serde(default)]
    pub trigger: Option<TriggerConfig>,
}

impl WorkflowRequest {
    fn into_document(self, id: String) -> WorkflowDocument {
        WorkflowDocument {
            id,
            name: self.name,
            description: self.description,
            nodes: self.nodes,
            edges: self.edges,
            trigger: self.trigger,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    #[serde(flatten)]
    pub document: WorkflowDocument,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct WorkflowSummaryResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct WorkflowListResponse {
    pub workflows: Vec<WorkflowSummaryResponse>,
}

fn to_workflow_response(record: WorkflowRecord) -> WorkflowResponse {
    WorkflowResponse {
        document: record.document,
        created_at: record.created_at.to_rfc3339(),
        updated_at: record.updated_at.to_rfc3339(),
    }
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /api/v1/workflows
pub async fn create_workflow_handler(
    State(state): State<AppState>,
    Json(req): Json<WorkflowRequest>,
) -> Result<(StatusCode, Json<WorkflowResponse>)> {
    let document = req.into_document(uuid::Uuid::new_v4().to_string());
    document.validate()?;

    let record = state.store.create_workflow(&document)?;
    Ok((StatusCode::CREATED, Json(to_workflow_response(record))))
}

/// GET /api/v1/workflows
pub async fn list_workflows_handler(
    State(state): State<AppState>,
) -> Result<Json<WorkflowListResponse>> {
    let workflows = state
        .store
        .list_workflows()?
        .into_iter()
        .map(|s| WorkflowSummaryResponse {
            id: s.id,
            name: s.name,
            description: s.description,
            updated_at: s.updated_at.to_rfc3339(),
        })
        .collect();
    Ok(Json(WorkflowListResponse { workflows }))
}

/// GET /api/v1/workflows/:id
pub async fn get_workflow_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowResponse>> {
    let record = state.store.get_workflow(&id)?;
    Ok(Json(to_workflow_response(record)))
}

/// PUT /api/v1/workflows/:id
pub async fn update_workflow_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WorkflowRequest>,
) -> Result<Json<WorkflowResponse>> {
    let document = req.into_document(id.clone());
    document.validate()?;

    let record = state.store.update_workflow(&id, &document)?;
    Ok(Json(to_workflow_response(record)))
}

/// DELETE /api/v1/workflows/:id
pub async fn delete_workflow_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete_workflow(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/workflows/:id/trigger
///
/// Queues a job for the workflow. Graph execution itself is handled by an
/// external runner; this endpoint only records the request.
pub async fn trigger_workflow_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobResponse>)> {
    let job = state.store.create_job(&id, JobTrigger::Manual)?;
    tracing::info!(workflow_id = %id, job_id = %job.id, "workflow triggered");
    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use flowdeck_store::{Job, JobStatus, JobTrigger};

use crate::error::Result;
use crate::state::AppState;

// ── Request/Response types ──────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub workflow_id: String,
    pub status: JobStatus,
    pub trigger: JobTrigger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            workflow_id: job.workflow_id,
            status: job.status,
            trigger: job.trigger,
            error: job.error,
            created_at: job.created_at.to_rfc3339(),
            started_at: job.started_at.map(|t| t.to_rfc3339()),
            finished_at: job.finished_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
}

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    /// Restrict the listing to one workflow.
    pub workflow_id: Option<String>,
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /api/v1/jobs
pub async fn list_jobs_handler(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<JobListResponse>> {
    let jobs = state
        .store
        .list_jobs(query.workflow_id.as_deref())?
        .into_iter()
        .map(JobResponse::from)
        .collect();
    Ok(Json(JobListResponse { jobs }))
}

/// GET /api/v1/jobs/:id
pub async fn get_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>> {
    let job = state.store.get_job(&id)?;
    Ok(Json(JobResponse::from(job)))
}

/// POST /api/v1/jobs/:id/cancel
pub async fn cancel_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>> {
    let job = state.store.cancel_job(&id)?;
    tracing::info!(job_id = %id, "job cancelled");
    Ok(Json(JobResponse::from(job)))
}

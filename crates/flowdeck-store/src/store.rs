use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flowdeck_types::WorkflowDocument;

use crate::{Result, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS workflows (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    definition TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    workflow_id TEXT NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
    status TEXT NOT NULL,
    trigger_kind TEXT NOT NULL,
    error TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_workflow ON jobs(workflow_id);
";

/// A stored workflow: the document plus persistence metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub document: WorkflowDocument,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for workflows (no full document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StoreError::Invalid(format!("Unknown job status: {other}"))),
        }
    }
}

/// What started a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTrigger {
    Manual,
    Schedule,
    Webhook,
}

impl JobTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Schedule => "schedule",
            Self::Webhook => "webhook",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "manual" => Ok(Self::Manual),
            "schedule" => Ok(Self::Schedule),
            "webhook" => Ok(Self::Webhook),
            other => Err(StoreError::Invalid(format!("Unknown job trigger: {other}"))),
        }
    }
}

/// One requested execution of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub workflow_id: String,
    pub status: JobStatus,
    pub trigger: JobTrigger,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Thin repository over SQLite for workflows and jobs.
///
/// Thread-safe via internal `Mutex<Connection>`.
pub struct WorkflowStore {
    conn: Mutex<Connection>,
}

impl WorkflowStore {
    /// Open (or create) the database at `path` and bootstrap the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection for use. Panics if poisoned.
    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ── Workflow CRUD ───────────────────────────────────────────────

    pub fn create_workflow(&self, document: &WorkflowDocument) -> Result<WorkflowRecord> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let definition = serde_json::to_string(document)?;

        self.conn().execute(
            "INSERT INTO workflows (id, name, description, definition, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                document.id,
                document.name,
                document.description,
                definition,
                now_str,
                now_str
            ],
        )?;

        Ok(WorkflowRecord {
            document: document.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_workflow(&self, id: &str) -> Result<WorkflowRecord> {
        let row = self
            .conn()
            .query_row(
                "SELECT definition, created_at, updated_at FROM workflows WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("workflow {id}")))?;

        Ok(WorkflowRecord {
            document: serde_json::from_str(&row.0)?,
            created_at: parse_dt(&row.1),
            updated_at: parse_dt(&row.2),
        })
    }

    pub fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, updated_at
             FROM workflows ORDER BY updated_at DESC, id",
        )?;
        let iter = stmt.query_map([], |row| {
            Ok(WorkflowSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                updated_at: parse_dt(&row.get::<_, String>(3)?),
            })
        })?;

        let mut rows = Vec::new();
        for r in iter {
            rows.push(r?);
        }
        Ok(rows)
    }

    /// Replace a workflow's document. The document id must match `id`.
    pub fn update_workflow(&self, id: &str, document: &WorkflowDocument) -> Result<WorkflowRecord> {
        if document.id != id {
            return Err(StoreError::Invalid(format!(
                "Document id '{}' does not match workflow '{id}'",
                document.id
            )));
        }

        let now = Utc::now();
        let definition = serde_json::to_string(document)?;
        let updated = self.conn().execute(
            "UPDATE workflows SET name = ?1, description = ?2, definition = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                document.name,
                document.description,
                definition,
                now.to_rfc3339(),
                id
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(format!("workflow {id}")));
        }
        self.get_workflow(id)
    }

    /// Delete a workflow and (via cascade) its jobs.
    pub fn delete_workflow(&self, id: &str) -> Result<()> {
        let deleted = self
            .conn()
            .execute("DELETE FROM workflows WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("workflow {id}")));
        }
        Ok(())
    }

    // ── Jobs ────────────────────────────────────────────────────────

    /// Queue a new job for a workflow.
    pub fn create_job(&self, workflow_id: &str, trigger: JobTrigger) -> Result<Job> {
        // Explicit existence check so callers get NotFound, not an FK error.
        self.get_workflow(workflow_id)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.conn().execute(
            "INSERT INTO jobs (id, workflow_id, status, trigger_kind, created_at)
             VALUES (?1, ?2, 'queued', ?3, ?4)",
            params![id, workflow_id, trigger.as_str(), now.to_rfc3339()],
        )?;

        Ok(Job {
            id,
            workflow_id: workflow_id.to_string(),
            status: JobStatus::Queued,
            trigger,
            error: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        })
    }

    pub fn get_job(&self, id: &str) -> Result<Job> {
        // row_to_job nests a Result so status parsing can fail; the outer `?`
        // unwraps the row lookup, the return value carries the inner parse.
        self.conn()
            .query_row(
                "SELECT id, workflow_id, status, trigger_kind, error, created_at, started_at, finished_at
                 FROM jobs WHERE id = ?1",
                params![id],
                row_to_job,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?
    }

    /// List jobs, newest first, optionally filtered by workflow.
    pub fn list_jobs(&self, workflow_id: Option<&str>) -> Result<Vec<Job>> {
        let conn = self.conn();
        let mut rows = Vec::new();

        if let Some(wf) = workflow_id {
            let mut stmt = conn.prepare(
                "SELECT id, workflow_id, status, trigger_kind, error, created_at, started_at, finished_at
                 FROM jobs WHERE workflow_id = ?1 ORDER BY created_at DESC, id",
            )?;
            let iter = stmt.query_map(params![wf], row_to_job)?;
            for r in iter {
                rows.push(r??);
            }
        } else {
            let mut stmt = conn.prepare(
                "SELECT id, workflow_id, status, trigger_kind, error, created_at, started_at, finished_at
                 FROM jobs ORDER BY created_at DESC, id",
            )?;
            let iter = stmt.query_map([], row_to_job)?;
            for r in iter {
                rows.push(r??);
            }
        }

        Ok(rows)
    }

    /// Cancel a job. Only queued or running jobs can be cancelled.
    pub fn cancel_job(&self, id: &str) -> Result<Job> {
        let job = self.get_job(id)?;
        match job.status {
            JobStatus::Queued | JobStatus::Running => {}
            other => {
                return Err(StoreError::Invalid(format!(
                    "Job {id} is {} and cannot be cancelled",
                    other.as_str()
                )));
            }
        }

        self.conn().execute(
            "UPDATE jobs SET status = 'cancelled', finished_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        self.get_job(id)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Job>> {
    let status: String = row.get(2)?;
    let trigger: String = row.get(3)?;
    Ok((|| {
        Ok(Job {
            id: row.get(0)?,
            workflow_id: row.get(1)?,
            status: JobStatus::parse(&status)?,
            trigger: JobTrigger::parse(&trigger)?,
            error: row.get(4)?,
            created_at: parse_dt(&row.get::<_, String>(5)?),
            started_at: row.get::<_, Option<String>>(6)?.map(|s| parse_dt(&s)),
            finished_at: row.get::<_, Option<String>>(7)?.map(|s| parse_dt(&s)),
        })
    })())
}

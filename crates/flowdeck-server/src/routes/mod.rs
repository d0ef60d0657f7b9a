//! API routes.

pub mod health;
pub mod jobs;
pub mod policy;
pub mod workflows;

pub use health::health_routes;
pub use jobs::{JobListResponse, JobResponse, cancel_job_handler, get_job_handler, list_jobs_handler};
pub use policy::{PolicyTestRequest, policy_test_handler};
pub use workflows::{
    WorkflowListResponse, WorkflowRequest, WorkflowResponse, create_workflow_handler,
    delete_workflow_handler, get_workflow_handler, list_workflows_handler,
    trigger_workflow_handler, update_workflow_handler,
};

//! Application state shared across handlers.

use std::sync::Arc;

use flowdeck_policy::PolicyEvaluator;
use flowdeck_store::WorkflowStore;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Workflow and job persistence.
    pub store: Arc<WorkflowStore>,

    /// Policy script evaluator.
    pub evaluator: Arc<PolicyEvaluator>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(store: WorkflowStore, evaluator: PolicyEvaluator, config: ServerConfig) -> Self {
        Self {
            store: Arc::new(store),
            evaluator: Arc::new(evaluator),
            config: Arc::new(config),
        }
    }
}

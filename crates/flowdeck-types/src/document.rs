//! Workflow document types and structural validation.
//!
//! A document is the JSON payload the canvas editor saves: a list of typed
//! nodes, the edges between them, and an optional trigger. Node and trigger
//! configuration are tagged unions keyed by their `type` field, so every
//! variant carries an explicit field set.
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "id": "7b0d…",
//!   "name": "expense_approval",
//!   "nodes": [
//!     { "id": "start", "config": { "type": "start" } },
//!     { "id": "check", "config": { "type": "sod-policy", "script": "…" } },
//!     { "id": "done", "config": { "type": "end" } }
//!   ],
//!   "edges": [
//!     { "from": "start", "to": "check" },
//!     { "from": "check", "to": "done" }
//!   ],
//!   "trigger": { "type": "schedule", "cron": "0 9 * * *" }
//! }
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DocumentError;

/// A complete workflow document as composed in the editor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowDocument {
    /// Server-assigned identifier.
    pub id: String,

    /// Unique workflow name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Nodes placed on the canvas.
    pub nodes: Vec<NodeDefinition>,

    /// Edges connecting the nodes.
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,

    /// How jobs for this workflow are started.
    #[serde(default)]
    pub trigger: Option<TriggerConfig>,
}

/// A single node within a workflow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeDefinition {
    /// Unique node identifier within this workflow.
    pub id: String,

    /// Display label shown on the canvas.
    #[serde(default)]
    pub label: Option<String>,

    /// Typed node configuration.
    pub config: NodeConfig,
}

/// What a node is and the configuration its type carries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeConfig {
    /// Entry point of the workflow. Exactly one per document.
    Start,

    /// A manual work step performed by a person.
    Process {
        /// Role or user the step is assigned to.
        #[serde(default)]
        assignee: Option<String>,
        /// Free-form instructions shown to the assignee.
        #[serde(default)]
        instructions: Option<String>,
    },

    /// A branching point. Outgoing edges are labeled with branch names.
    Decision {
        /// Branch labels. Each must be covered by exactly one outgoing edge.
        branches: Vec<String>,
    },

    /// Call an external HTTP API.
    ApiCall {
        /// Request URL.
        url: String,
        /// HTTP method.
        #[serde(default)]
        method: HttpMethod,
        /// Request headers.
        #[serde(default)]
        headers: HashMap<String, String>,
        /// Optional body template with `{{field}}` placeholders.
        #[serde(default)]
        body_template: Option<String>,
    },

    /// Send a prompt to a chatbot backend.
    Chatbot {
        /// Prompt template.
        prompt: String,
        /// Optional model override.
        #[serde(default)]
        model: Option<String>,
    },

    /// Human approval step.
    Approval(ApprovalConfig),

    /// Separation-of-duties policy check backed by a user-authored script.
    SodPolicy {
        /// Policy script source. Executed only via the policy test endpoint.
        script: String,
    },

    /// Terminal node. At least one per document.
    End,
}

/// HTTP method for API-call nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

/// Configuration for approval nodes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApprovalConfig {
    /// Users or roles asked to approve.
    pub approvers: Vec<String>,

    /// How many approvals are needed.
    #[serde(default)]
    pub strategy: ApprovalStrategy,
}

/// Approval strategies supported by the editor palette.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ApprovalStrategy {
    /// Any single approver is enough.
    #[default]
    Single,
    /// At least `count` approvers must approve.
    Quorum { count: usize },
    /// Every listed approver must approve.
    Unanimous,
}

/// An edge between two nodes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EdgeDefinition {
    /// Source node id.
    pub from: String,

    /// Target node id.
    pub to: String,

    /// Branch label, required when `from` is a decision node.
    #[serde(default)]
    pub branch: Option<String>,
}

/// How jobs for a workflow are started.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TriggerConfig {
    /// Cron schedule.
    Schedule {
        /// Cron expression (e.g., "0 9 * * *"). Stored opaquely; syntax is
        /// validated in the editor.
        cron: String,
        /// IANA timezone.
        #[serde(default = "default_timezone")]
        timezone: String,
    },

    /// Inbound webhook.
    Webhook {
        /// URL slug the webhook listens on.
        slug: String,
    },

    /// Started explicitly by a user.
    Manual,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl WorkflowDocument {
    /// Create an empty document with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            trigger: None,
        }
    }

    /// Parse a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the document to a JSON string.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl WorkflowDocument {
    /// Validate the document's structure.
    ///
    /// Checks:
    /// - Non-empty name and at least one node
    /// - No duplicate node ids
    /// - Exactly one start node, at least one end node
    /// - All edges reference existing nodes; end nodes have no outgoing edges
    /// - Decision branches are unique and each covered by exactly one edge;
    ///   only decision edges carry branch labels
    /// - Approval and API-call configuration is coherent
    /// - SOD policy scripts are non-empty
    /// - No cycles; every node is reachable from the start node
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.name.is_empty() {
            return Err(DocumentError::Invalid(
                "Workflow name cannot be empty".into(),
            ));
        }

        if self.nodes.is_empty() {
            return Err(DocumentError::Invalid(
                "Workflow must have at least one node".into(),
            ));
        }

        // Check for duplicate node ids
        let mut seen_ids = HashSet::new();
        for node in &self.nodes {
            if node.id.is_empty() {
                return Err(DocumentError::Invalid("Node id cannot be empty".into()));
            }
            if !seen_ids.insert(node.id.as_str()) {
                return Err(DocumentError::Invalid(format!(
                    "Duplicate node id: {}",
                    node.id
                )));
            }
        }

        // Exactly one start, at least one end
        let start_count = self
            .nodes
            .iter()
            .filter(|n| matches!(n.config, NodeConfig::Start))
            .count();
        if start_count != 1 {
            return Err(DocumentError::Invalid(format!(
                "Workflow must have exactly one start node, found {start_count}"
            )));
        }
        if !self
            .nodes
            .iter()
            .any(|n| matches!(n.config, NodeConfig::End))
        {
            return Err(DocumentError::Invalid(
                "Workflow must have at least one end node".into(),
            ));
        }

        // All edges reference existing nodes
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !seen_ids.contains(endpoint.as_str()) {
                    return Err(DocumentError::Invalid(format!(
                        "Edge references unknown node '{endpoint}'"
                    )));
                }
            }
        }

        // Per-node configuration checks
        for node in &self.nodes {
            self.validate_node(node)?;
        }

        // Cycle detection via topological sort (Kahn's algorithm)
        self.detect_cycles()?;

        // Every node must be reachable from the start node
        self.check_reachability()?;

        Ok(())
    }

    fn validate_node(&self, node: &NodeDefinition) -> Result<(), DocumentError> {
        let outgoing: Vec<&EdgeDefinition> =
            self.edges.iter().filter(|e| e.from == node.id).collect();

        match &node.config {
            NodeConfig::Decision { branches } => {
                if branches.len() < 2 {
                    return Err(DocumentError::Invalid(format!(
                        "Decision node '{}' must declare at least two branches",
                        node.id
                    )));
                }
                let mut seen = HashSet::new();
                for branch in branches {
                    if branch.is_empty() {
                        return Err(DocumentError::Invalid(format!(
                            "Decision node '{}' has an empty branch label",
                            node.id
                        )));
                    }
                    if !seen.insert(branch.as_str()) {
                        return Err(DocumentError::Invalid(format!(
                            "Decision node '{}' declares branch '{}' twice",
                            node.id, branch
                        )));
                    }
                }

                // Each branch is covered by exactly one outgoing edge
                for branch in branches {
                    let count = outgoing
                        .iter()
                        .filter(|e| e.branch.as_deref() == Some(branch.as_str()))
                        .count();
                    if count != 1 {
                        return Err(DocumentError::Invalid(format!(
                            "Branch '{}' of decision node '{}' must have exactly one outgoing edge, found {}",
                            branch, node.id, count
                        )));
                    }
                }
                for edge in &outgoing {
                    match &edge.branch {
                        Some(label) if seen.contains(label.as_str()) => {}
                        Some(label) => {
                            return Err(DocumentError::Invalid(format!(
                                "Edge from decision node '{}' uses undeclared branch '{}'",
                                node.id, label
                            )));
                        }
                        None => {
                            return Err(DocumentError::Invalid(format!(
                                "Edge from decision node '{}' to '{}' is missing a branch label",
                                node.id, edge.to
                            )));
                        }
                    }
                }
            }

            NodeConfig::End => {
                if !outgoing.is_empty() {
                    return Err(DocumentError::Invalid(format!(
                        "End node '{}' cannot have outgoing edges",
                        node.id
                    )));
                }
            }

            NodeConfig::ApiCall { url, .. } => {
                if url.is_empty() {
                    return Err(DocumentError::Invalid(format!(
                        "API-call node '{}' has an empty url",
                        node.id
                    )));
                }
            }

            NodeConfig::Chatbot { prompt, .. } => {
                if prompt.is_empty() {
                    return Err(DocumentError::Invalid(format!(
                        "Chatbot node '{}' has an empty prompt",
                        node.id
                    )));
                }
            }

            NodeConfig::Approval(config) => {
                if config.approvers.is_empty() {
                    return Err(DocumentError::Invalid(format!(
                        "Approval node '{}' has no approvers",
                        node.id
                    )));
                }
                if let ApprovalStrategy::Quorum { count } = config.strategy {
                    if count == 0 || count > config.approvers.len() {
                        return Err(DocumentError::Invalid(format!(
                            "Approval node '{}' has quorum {} outside 1..={}",
                            node.id,
                            count,
                            config.approvers.len()
                        )));
                    }
                }
            }

            NodeConfig::SodPolicy { script } => {
                if script.trim().is_empty() {
                    return Err(DocumentError::Invalid(format!(
                        "SOD policy node '{}' has an empty script",
                        node.id
                    )));
                }
            }

            NodeConfig::Start | NodeConfig::Process { .. } => {}
        }

        // Branch labels are only meaningful on decision edges
        if !matches!(node.config, NodeConfig::Decision { .. }) {
            if let Some(edge) = outgoing.iter().find(|e| e.branch.is_some()) {
                return Err(DocumentError::Invalid(format!(
                    "Edge from '{}' to '{}' carries a branch label but '{}' is not a decision node",
                    node.id, edge.to, node.id
                )));
            }
        }

        Ok(())
    }

    /// Detect cycles in the edge graph using Kahn's algorithm.
    fn detect_cycles(&self) -> Result<(), DocumentError> {
        let node_ids: Vec<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let id_to_idx: HashMap<&str, usize> = node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        let n = node_ids.len();
        let mut in_degree = vec![0usize; n];
        let mut adj: Vec<Vec<usize>> = vec![vec![]; n];

        for edge in &self.edges {
            let from = id_to_idx[edge.from.as_str()];
            let to = id_to_idx[edge.to.as_str()];
            adj[from].push(to);
            in_degree[to] += 1;
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0;

        while let Some(node) = queue.pop() {
            visited += 1;
            for &neighbor in &adj[node] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    queue.push(neighbor);
                }
            }
        }

        if visited != n {
            return Err(DocumentError::Invalid(
                "Cycle detected in workflow edges".into(),
            ));
        }

        Ok(())
    }

    /// Verify every node is reachable from the start node.
    fn check_reachability(&self) -> Result<(), DocumentError> {
        // Start presence is enforced before this runs.
        let Some(start) = self
            .nodes
            .iter()
            .find(|n| matches!(n.config, NodeConfig::Start))
            .map(|n| n.id.as_str())
        else {
            return Ok(());
        };

        let mut reachable = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            for edge in self.edges.iter().filter(|e| e.from == id) {
                stack.push(edge.to.as_str());
            }
        }

        if let Some(orphan) = self.nodes.iter().find(|n| !reachable.contains(n.id.as_str())) {
            return Err(DocumentError::Invalid(format!(
                "Node '{}' is not reachable from the start node",
                orphan.id
            )));
        }

        Ok(())
    }
}

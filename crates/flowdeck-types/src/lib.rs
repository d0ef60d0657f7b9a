//! Shared workflow document model for Flowdeck.
//!
//! A workflow is a typed node graph composed in the canvas editor: nodes
//! (start, process, decision, API call, chatbot, approval, SOD policy, end)
//! connected by edges, with an optional trigger describing how jobs are
//! started. Documents travel as JSON between the editor, the HTTP API, and
//! the store; this crate owns their shape and structural validation.

pub mod document;
pub mod error;

pub use document::{
    ApprovalConfig, ApprovalStrategy, EdgeDefinition, HttpMethod, NodeConfig, NodeDefinition,
    TriggerConfig, WorkflowDocument,
};
pub use error::DocumentError;

//! Error types for the document model.

use thiserror::Error;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors produced while parsing or validating a workflow document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Document is not valid JSON or does not match the schema.
    #[error("Document parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Document violates a structural invariant.
    #[error("Invalid workflow: {0}")]
    Invalid(String),
}

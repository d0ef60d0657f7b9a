//! Error types for policy evaluation.

use thiserror::Error;

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors that can occur while evaluating a policy script.
///
/// All variants are mechanism-level failures: a script that runs and rejects
/// (or returns its own error) is not a `PolicyError`, it is a negative
/// [`Verdict`](crate::Verdict).
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Script violates the policy contract (empty, or no `validateSOD`).
    #[error("Invalid policy script: {0}")]
    Contract(String),

    /// Script failed to compile (compiler diagnostics attached).
    #[error("Policy compilation failed: {0}")]
    CompileFailed(String),

    /// Script exceeded the execution budget.
    #[error("Policy script timed out after {0} ms")]
    Timeout(u64),

    /// Script crashed or the sandbox itself errored.
    #[error("Policy execution failed: {0}")]
    Execution(String),
}

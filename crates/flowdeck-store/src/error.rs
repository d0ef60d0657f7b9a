//! Error types for the store.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state transition or input.
    #[error("Invalid operation: {0}")]
    Invalid(String),

    /// Underlying SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored document failed to (de)serialize.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

//! Error types for Braid.
//!
//! Uses thiserror for ergonomic error definitions. Retrieval is
//! read-only and idempotent, so callers are free to retry any
//! failed operation; no retries happen inside this crate.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Resource errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // External service errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether the error indicates bad caller input rather than a
    /// store-side failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

//! Error types shared across the cointrack crates.

use thiserror::Error;

use crate::sync::FetchError;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for domain operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer failure.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Block-explorer fetch failure.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Entity lookup failed.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violated (e.g. address already registered).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A sync run already holds the per-address lock.
    #[error("Sync already in progress for address {0}")]
    SyncInProgress(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything without a more specific variant.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Storage-layer error categories surfaced to the domain.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Could not get a connection from the pool: {0}")]
    PoolGet(String),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

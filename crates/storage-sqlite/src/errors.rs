//! Storage error type and its conversion into the domain error.

use thiserror::Error;

use cointrack_core::errors::{DatabaseError, Error as CoreError};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Query(e) => CoreError::Database(DatabaseError::QueryFailed(e.to_string())),
            StorageError::Pool(e) => CoreError::Database(DatabaseError::PoolGet(e.to_string())),
            StorageError::Migration(msg) | StorageError::Internal(msg) => {
                CoreError::Database(DatabaseError::Internal(msg))
            }
        }
    }
}

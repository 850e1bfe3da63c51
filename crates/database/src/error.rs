use core_types::CoreError;
use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    #[error("Failed to connect to the database at '{target}': {reason}")]
    Connection { target: String, reason: String },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Failed to commit the session: {0}")]
    Commit(String),

    #[error("Failed to roll back the session: {0}")]
    Rollback(String),

    #[error("Failed to release the database handle: {0}")]
    Release(String),

    #[error("Batch size must be a positive integer, got {0}")]
    InvalidBatchSize(usize),

    #[error("Unexpected column value: {0}")]
    Column(#[from] CoreError),
}

impl DbError {
    pub fn connection(target: &str, reason: impl Display) -> Self {
        DbError::Connection {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for failures of the persistence step itself (commit or rollback).
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, DbError::Commit(_) | DbError::Rollback(_))
    }
}

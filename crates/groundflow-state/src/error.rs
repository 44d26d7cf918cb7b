//! State storage and locking error types

use chrono::{DateTime, Utc};
use thiserror::Error;

/// State layer errors
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Version conflict on '{artifact}': expected serial {expected}, found {actual}")]
    VersionConflict {
        artifact: String,
        expected: u64,
        actual: u64,
    },

    #[error("State is locked by {holder} since {acquired_at}")]
    AlreadyLocked {
        holder: String,
        acquired_at: DateTime<Utc>,
    },

    #[error("Lock on '{0}' was lost")]
    LockLost(String),

    #[error("State file error: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StateError {
    /// Retryable errors may be resolved by re-reading state and re-planning.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StateError::VersionConflict { .. } | StateError::AlreadyLocked { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StateError>;

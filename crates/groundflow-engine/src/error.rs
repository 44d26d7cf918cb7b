//! Engine error types

use thiserror::Error;

/// Plan/apply engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Stale plan: state serial {actual} no longer matches planned serial {planned}")]
    StalePlan { planned: u64, actual: u64 },

    #[error(transparent)]
    State(#[from] groundflow_state::StateError),

    #[error(transparent)]
    Manifest(#[from] groundflow_core::ManifestError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

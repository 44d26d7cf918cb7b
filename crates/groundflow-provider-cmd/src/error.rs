//! Command provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmdError {
    #[error("provider command is not configured")]
    CommandNotConfigured,

    #[error("provider command failed ({operation}): {stderr}")]
    CommandFailed { operation: String, stderr: String },

    #[error("provider response is not valid JSON: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("provider response has no '{0}' field")]
    MissingField(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CmdError> for groundflow_engine::EngineError {
    fn from(e: CmdError) -> Self {
        groundflow_engine::EngineError::Provider(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CmdError>;

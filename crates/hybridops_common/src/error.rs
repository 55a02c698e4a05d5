//! Error taxonomy for the plan/execute protocol.
//!
//! Unclear intent is not an error; it is its own terminal outcome.

use crate::ledger::ConfirmError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpsError {
    /// Malformed command shape or missing required field
    #[error("{0}")]
    Validation(String),

    /// Absent, expired or mismatched confirm token
    #[error(transparent)]
    Token(#[from] ConfirmError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Non-2xx status, explicit error field, transport failure or timeout
    #[error("{0}")]
    Downstream(String),
}

impl OpsError {
    pub fn kind(&self) -> &'static str {
        match self {
            OpsError::Validation(_) => "validation",
            OpsError::Token(_) => "token",
            OpsError::UnknownTool(_) => "unknown_tool",
            OpsError::Downstream(_) => "downstream",
        }
    }
}

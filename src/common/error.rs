/// Error type shared by every panel operation.
use crate::common::security::ValidationError;
use axum::http::StatusCode;
use thiserror::Error;

pub type PanelResult<T> = Result<T, PanelError>;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("command not allowed: {0}")]
    CommandNotAllowed(String),

    #[error("invalid character {character:?} in argument: {argument}")]
    InvalidArgument { argument: String, character: char },

    #[error("command failed: {stderr}")]
    ExecutionFailed { command: String, stderr: String },

    #[error("command {command} timed out after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },

    /// Deliberately carries no path.
    #[error("path escapes the allowed directory")]
    PathEscape,

    #[error("change saved but {service} reload failed: {reason}")]
    ReloadFailed { service: String, reason: String },

    #[error("{operation} partially applied (completed: {}; failed at {failed_step}): {reason}", completed.join(", "))]
    PartialFailure {
        operation: String,
        completed: Vec<String>,
        failed_step: String,
        reason: String,
    },

    #[error("payload too large (max {max_bytes} bytes)")]
    PayloadTooLarge { max_bytes: u64 },

    #[error("{0}")]
    Unauthorized(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PanelError {
    /// HTTP status an adapter should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            PanelError::Validation(_) | PanelError::InvalidArgument { .. } => {
                StatusCode::BAD_REQUEST
            }
            PanelError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PanelError::Forbidden(_) | PanelError::CommandNotAllowed(_) | PanelError::PathEscape => {
                StatusCode::FORBIDDEN
            }
            PanelError::NotFound(_) => StatusCode::NOT_FOUND,
            PanelError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PanelError::ExecutionFailed { .. }
            | PanelError::Timeout { .. }
            | PanelError::ReloadFailed { .. }
            | PanelError::PartialFailure { .. }
            | PanelError::Io(_)
            | PanelError::Config(_)
            | PanelError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        PanelError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        PanelError::NotFound(msg.into())
    }
}

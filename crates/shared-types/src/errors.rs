//! Common error types used across all Mathboard crates
//! Provides consistent error reporting toward the UI layer

use crate::command::CommandError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base error type surfaced to the user interface
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum MathboardError {
    // Computation host errors
    #[error("Computation host failed to start: {message}")]
    HostInit { message: String },

    #[error("Computation host crashed: {message}")]
    HostCrashed { message: String },

    #[error("Computation failed: {message}")]
    Computation { message: String },

    #[error("Request timeout: {message}")]
    Timeout { message: String, duration_ms: u64 },

    // Command errors
    #[error("Invalid command: {message}")]
    InvalidCommand { message: String },

    #[error("Malformed payload: {message}")]
    Parse { message: String },

    // Scene errors
    #[error("Element not found: {id}")]
    ElementNotFound { id: String },

    #[error("Render error for element {id}: {message}")]
    Render { id: String, message: String },

    // Network errors
    #[error("Network request failed: {message}")]
    Network { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MathboardError {
    /// Whether the session can continue without a host restart.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            MathboardError::HostInit { .. } | MathboardError::HostCrashed { .. }
        )
    }
}

/// Result type alias for operations reported to the UI
pub type MathboardResult<T> = Result<T, MathboardError>;

/// Error envelope handed to the presentation layer
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: MathboardError,
    pub timestamp: u64,
    pub context: Option<ErrorContext>,
}

/// Where the error happened
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
}

impl ErrorResponse {
    pub fn new(error: MathboardError) -> Self {
        Self {
            success: false,
            error,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            context: None,
        }
    }

    pub fn with_context(mut self, component: &str, operation: &str) -> Self {
        self.context = Some(ErrorContext {
            component: component.to_string(),
            operation: operation.to_string(),
        });
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"type":"Internal","details":{"message":"Failed to serialize error"}}}"#.to_string()
        })
    }
}

impl From<serde_json::Error> for MathboardError {
    fn from(err: serde_json::Error) -> Self {
        MathboardError::Parse {
            message: err.to_string(),
        }
    }
}

impl From<CommandError> for MathboardError {
    fn from(err: CommandError) -> Self {
        MathboardError::InvalidCommand {
            message: err.to_string(),
        }
    }
}

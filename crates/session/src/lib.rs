//! Mathboard session
//!
//! Ties one computation bridge, one scene model with its reconciler and one
//! interaction controller into a session object that is created at session
//! start and torn down explicitly.

pub mod graph;
pub mod intent;
pub mod session;

pub use graph::{graph_elements, InlineError};
pub use intent::IntentClient;
pub use session::{Session, SessionConfig};

use mathboard_config::ConfigError;
use mathboard_rpc::BridgeError;
use mathboard_scene::SceneError;
use mathboard_shared::{CommandError, ErrorResponse, MathboardError};
use thiserror::Error;

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Intent service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Intent service returned an unusable response: {0}")]
    IntentDecode(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Envelope handed to the presentation layer for a failed session call.
    pub fn into_response(self, operation: &str) -> ErrorResponse {
        ErrorResponse::new(self.into()).with_context("Session", operation)
    }
}

impl From<SessionError> for MathboardError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Bridge(e) => e.into(),
            SessionError::Scene(SceneError::NotFound(id)) => MathboardError::ElementNotFound {
                id: id.to_string(),
            },
            SessionError::Scene(e) => MathboardError::InvalidCommand {
                message: e.to_string(),
            },
            SessionError::Command(e) => e.into(),
            SessionError::Config(e) => MathboardError::Internal {
                message: e.to_string(),
            },
            SessionError::Http(e) => MathboardError::Network {
                message: e.to_string(),
            },
            SessionError::IntentDecode(message) => MathboardError::Parse { message },
        }
    }
}

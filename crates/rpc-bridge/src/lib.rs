//! Computation host bridge
//!
//! Owns the handle to the sandboxed computation host, correlates outgoing
//! commands with incoming responses, enforces per-request deadlines and
//! broadcasts the host lifecycle status.

pub mod bridge;
pub mod client;
pub mod correlation;
pub mod engine_host;
pub mod host;
pub mod lifecycle;
pub mod protocol;

pub use bridge::{BridgeConfig, RpcBridge};
pub use client::MathClient;
pub use engine_host::{EngineHost, MathEngine};
pub use host::{HostEvent, HostFactory, HostHandle};
pub use lifecycle::{LifecycleStats, StatusBoard};
pub use protocol::{HostMessage, HostRequest, RequestId};

use mathboard_shared::MathboardError;
use thiserror::Error;

/// Bridge errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Host initialization failed: {0}")]
    HostInit(String),

    #[error("Host crashed: {0}")]
    HostCrashed(String),

    #[error("Host unavailable: {0}")]
    HostUnavailable(String),

    #[error("Host rejected request {id}: {message}")]
    HostRejected { id: RequestId, message: String },

    #[error("Request {id} timed out after {after_ms} ms")]
    Timeout { id: RequestId, after_ms: u64 },

    #[error("Request {id} was abandoned by a host restart")]
    HostRestarted { id: RequestId },

    #[error("Request {0} was cancelled")]
    Cancelled(RequestId),

    #[error("Malformed result: {0}")]
    MalformedResult(String),

    #[error("Encoding error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<BridgeError> for MathboardError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::HostInit(message) => MathboardError::HostInit { message },
            BridgeError::HostCrashed(message) | BridgeError::HostUnavailable(message) => {
                MathboardError::HostCrashed { message }
            }
            BridgeError::HostRejected { message, .. } => MathboardError::Computation { message },
            BridgeError::Timeout { id, after_ms } => MathboardError::Timeout {
                message: format!("request {id} did not answer"),
                duration_ms: after_ms,
            },
            BridgeError::HostRestarted { .. } | BridgeError::Cancelled(_) => {
                MathboardError::Cancelled
            }
            BridgeError::MalformedResult(message) => MathboardError::Parse { message },
            BridgeError::Encode(message) => MathboardError::Internal { message },
        }
    }
}

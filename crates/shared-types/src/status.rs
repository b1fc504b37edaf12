//! Worker status broadcast by the RPC bridge

use serde::{Deserialize, Serialize};

/// Lifecycle phase of the computation host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkerPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Process-wide status of the computation host. Has no correlation id: it
/// is a broadcast value, not a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkerStatus {
    pub phase: WorkerPhase,
    #[serde(default)]
    pub message: String,
}

impl WorkerStatus {
    pub fn new(phase: WorkerPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == WorkerPhase::Ready
    }

    pub fn is_error(&self) -> bool {
        self.phase == WorkerPhase::Error
    }
}

//! Message protocol spoken with the computation host
//!
//! Requests: `{ type, id, payload }`.
//! Responses: `{ type: "status", status, message }` (unsolicited, no id),
//! `{ type: "result", id, payload }` or `{ type: "error", id, error }`.

use mathboard_shared::{RequestKind, WorkerPhase};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Correlation id pairing a request with its response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRequest {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub id: RequestId,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostMessage {
    Status {
        status: WorkerPhase,
        #[serde(default)]
        message: String,
    },
    Result {
        id: RequestId,
        #[serde(default)]
        payload: Value,
    },
    Error {
        id: RequestId,
        error: String,
    },
}

impl HostMessage {
    /// Correlation id, absent for status broadcasts.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            HostMessage::Status { .. } => None,
            HostMessage::Result { id, .. } | HostMessage::Error { id, .. } => Some(id),
        }
    }
}

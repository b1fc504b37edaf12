//! Typed command execution on top of the bridge

use crate::bridge::RpcBridge;
use crate::{BridgeError, Result};
use futures::future::join_all;
use mathboard_shared::{Command, CommandResult, RawCommand};
use serde_json::Value;
use std::sync::Arc;

/// Executes [`Command`]s and decodes their [`CommandResult`]s.
///
/// Cheap to clone; clones share one bridge.
#[derive(Clone)]
pub struct MathClient {
    bridge: Arc<RpcBridge>,
}

impl MathClient {
    pub fn new(bridge: Arc<RpcBridge>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<RpcBridge> {
        &self.bridge
    }

    /// Run one command, starting the host first if needed.
    ///
    /// A computation failure (`success: false`) is a valid result, not an
    /// error; errors mean the host could not answer at all.
    pub async fn execute(&self, command: &Command) -> Result<CommandResult> {
        self.bridge.init().await?;

        let raw = RawCommand::from(command.clone());
        let payload = serde_json::to_value(&raw).map_err(|e| BridgeError::Encode(e.to_string()))?;

        log::debug!("Executing {} as {}", command.intent.name(), command.request_kind());
        let response = self.bridge.send(command.request_kind(), payload).await?;
        decode_result(response)
    }

    /// Run several commands concurrently. Results come back in input order.
    pub async fn execute_all(&self, commands: &[Command]) -> Vec<Result<CommandResult>> {
        join_all(commands.iter().map(|command| self.execute(command))).await
    }
}

fn decode_result(response: Value) -> Result<CommandResult> {
    // A bare failure with neither graphs nor elements still counts as a result.
    if response.get("success") == Some(&Value::Bool(false))
        && response.get("graphs").is_none()
        && response.get("elements").is_none()
    {
        let error = response
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                BridgeError::MalformedResult("failed result without an error message".to_string())
            })?;
        return Ok(CommandResult::failure_graph(error));
    }

    let result: CommandResult =
        serde_json::from_value(response).map_err(|e| BridgeError::MalformedResult(e.to_string()))?;
    result.check_consistency().map_err(BridgeError::MalformedResult)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_graph_result() {
        let result = decode_result(json!({
            "success": true,
            "graphs": [{ "fn": "Math.sin(x)", "color": "#2563eb" }],
            "explanation": "sine"
        }))
        .unwrap();
        assert!(result.success());
        assert_eq!(result.explanation(), "sine");
    }

    #[test]
    fn test_decode_bare_failure() {
        let result = decode_result(json!({ "success": false, "error": "could not parse 'sin('" })).unwrap();
        assert!(!result.success());
        assert_eq!(result.error(), Some("could not parse 'sin('"));
    }

    #[test]
    fn test_failure_without_message_is_malformed() {
        let err = decode_result(json!({ "success": false, "graphs": [] })).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedResult(_)));
    }

    #[test]
    fn test_unrecognised_shape_is_malformed() {
        let err = decode_result(json!({ "answer": 42 })).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedResult(_)));
    }
}

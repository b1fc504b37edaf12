//! Contract of the intent-parsing service (`POST /generate`)

use crate::command::{Command, CommandError, RawCommand};
use crate::element::Element;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Request body of `POST /generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Response body of `POST /generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResponse {
    pub intent: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<Element>>,
}

impl IntentResponse {
    /// Parse a response that may arrive wrapped in a Markdown code fence.
    pub fn from_model_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(strip_code_fence(text))
    }

    /// Only the `{intent, data, explanation}` triple becomes a command.
    pub fn into_command(self) -> Result<Command, CommandError> {
        Command::try_from(RawCommand {
            intent: self.intent,
            data: self.data,
            explanation: Some(self.explanation).filter(|e| !e.is_empty()),
        })
    }
}

/// Extract the body of a ```json (or bare ```) fenced block, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let body = if let Some((_, rest)) = text.split_once("```json") {
        rest
    } else if let Some((_, rest)) = text.split_once("```") {
        rest
    } else {
        return text.trim();
    };
    body.split("```").next().unwrap_or(body).trim()
}

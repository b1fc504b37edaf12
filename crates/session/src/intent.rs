//! Client for the intent-parsing service

use crate::{Result, SessionError};
use mathboard_shared::intent::{ChatMessage, ChatRole, IntentResponse, PromptRequest};
use mathboard_shared::{Command, Element};
use std::time::Duration;

/// Posts prompts to `{endpoint}/generate` and turns the answer into a
/// validated [`Command`].
///
/// Keeps the conversation history so follow-up prompts ("now its
/// derivative") have context.
pub struct IntentClient {
    http: reqwest::Client,
    endpoint: String,
    history: Vec<ChatMessage>,
}

impl IntentClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            history: Vec::new(),
        })
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// One raw round trip. `scene` is sent along as context when non-empty.
    pub async fn generate(&self, prompt: &str, scene: &[Element]) -> Result<IntentResponse> {
        let mut history = self.history.clone();
        if !scene.is_empty() {
            let elements = serde_json::to_string(scene)
                .map_err(|e| SessionError::IntentDecode(e.to_string()))?;
            history.push(ChatMessage {
                role: ChatRole::User,
                content: format!("Current scene elements: {elements}"),
            });
        }

        let request = PromptRequest {
            prompt: prompt.to_string(),
            history,
        };
        let url = format!("{}/generate", self.endpoint);
        log::debug!("POST {}", url);

        let body = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        IntentResponse::from_model_text(&body).map_err(|e| {
            log::warn!("Intent service returned undecodable body: {}", e);
            SessionError::IntentDecode(e.to_string())
        })
    }

    /// Ask for a command and record the exchange in the history.
    pub async fn command_for(&mut self, prompt: &str, scene: &[Element]) -> Result<Command> {
        let response = self.generate(prompt, scene).await?;
        if response.elements.is_some() {
            log::debug!("Ignoring elements attached to intent response");
        }

        self.history.push(ChatMessage {
            role: ChatRole::User,
            content: prompt.to_string(),
        });
        if !response.explanation.is_empty() {
            self.history.push(ChatMessage {
                role: ChatRole::Assistant,
                content: response.explanation.clone(),
            });
        }

        Ok(response.into_command()?)
    }
}

//! HTTP boundary of the question generator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::QuestionServiceConfig;
use crate::error::QuestionError;

/// One message of a chat-completion request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Request body: `{model, messages}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Reply body: `{choices: [{message: {content}}]}`. Other fields are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatResponse {
    /// Text of the first choice.
    pub fn first_content(&self) -> Result<&str, QuestionError> {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or(QuestionError::NoChoices)
    }
}

/// Sends a chat request and returns the raw reply body.
///
/// Implementations run on the generator's worker thread.
pub trait ChatTransport: Send + Sync {
    fn complete(&self, request: &ChatRequest) -> Result<String, QuestionError>;
}

/// Blocking HTTPS transport.
pub struct UreqTransport {
    agent: ureq::Agent,
    api_url: String,
    api_key: String,
}

impl UreqTransport {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a transport from the service config, or `NotConfigured` when no
    /// API key is available.
    pub fn from_config(config: &QuestionServiceConfig) -> Result<Self, QuestionError> {
        let key = config.resolve_api_key().ok_or(QuestionError::NotConfigured)?;
        Ok(Self::new(
            config.api_url.clone(),
            key,
            Duration::from_secs(config.timeout_secs),
        ))
    }
}

impl ChatTransport for UreqTransport {
    fn complete(&self, request: &ChatRequest) -> Result<String, QuestionError> {
        let response = self
            .agent
            .post(&self.api_url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(request)?;
        Ok(response.into_string()?)
    }
}

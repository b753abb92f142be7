//! Generation client contract

use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One prompt for a text-generation backend
///
/// Unset sampling parameters fall back to the backend's configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: String,
    /// Optional system prompt
    pub system_prompt: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Completion length cap
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create request for `prompt`
    #[inline]
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set system prompt
    #[inline]
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Chat messages in system, user order
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            out.push(ChatMessage::new("system", system.clone()));
        }
        out.push(ChatMessage::new("user", self.prompt.clone()));
        out
    }
}

/// Role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create message
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Text-generation capability
///
/// Implementations return the model's raw text; callers own all parsing
/// and validation.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for `request`
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Verify the backend is reachable and serves the configured model
    async fn health_check(&self) -> Result<(), GenerationError>;

    /// Model identifier
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_put_system_first() {
        let req = GenerationRequest::new("classify").with_system_prompt("you are an SRE");
        let msgs = req.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert_eq!(msgs[1].content, "classify");
    }

    #[test]
    fn messages_without_system() {
        let msgs = GenerationRequest::new("hi").messages();
        assert_eq!(msgs, vec![ChatMessage::new("user", "hi")]);
    }

    #[test]
    fn builder_sets_sampling() {
        let req = GenerationRequest::new("p").with_temperature(0.2).with_max_tokens(1500);
        assert_eq!(req.temperature, Some(0.2));
        assert_eq!(req.max_tokens, Some(1500));
    }
}

//! OpenAI-compatible backend (Groq, OpenAI, vLLM and friends)
//!
//! Uses `/chat/completions` for generation, `/models` for the health check
//! and `/embeddings` for vectors. Authentication is a bearer key.

use crate::client::{ChatMessage, GenerationClient, GenerationRequest};
use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use triage_index::{check_dimensions, Embedder, EmbeddingError};

/// Groq's OpenAI-compatible endpoint
pub const DEFAULT_OPENAI_COMPATIBLE_URL: &str = "https://api.groq.com/openai/v1";

const BACKEND: &str = "openai-compatible";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    /// Null for some reasoning models mid-thought
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Read a non-empty API key from `env_var`
///
/// # Errors
/// `GenerationError::MissingApiKey` when unset or blank.
pub fn api_key_from_env(env_var: &str) -> Result<String, GenerationError> {
    match std::env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(GenerationError::MissingApiKey {
            env_var: env_var.to_string(),
        }),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Chat-completions client
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleClient {
    /// Create client with an explicit key
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.1,
            max_tokens: 2048,
        }
    }

    /// Create client reading its key from `env_var`
    ///
    /// # Errors
    /// `GenerationError::MissingApiKey` when the variable is unset.
    pub fn from_env(
        model: impl Into<String>,
        base_url: impl Into<String>,
        env_var: &str,
    ) -> Result<Self, GenerationError> {
        Ok(Self::new(model, base_url, api_key_from_env(env_var)?))
    }

    /// Use a preconfigured HTTP client
    #[inline]
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Default sampling used when a request leaves it unset
    #[inline]
    #[must_use]
    pub fn with_defaults(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl GenerationClient for OpenAiCompatibleClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: request.messages(),
            temperature: request.temperature.unwrap_or(self.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::from_transport(BACKEND, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text);
            tracing::error!(status, %message, "chat completion failed");
            return Err(GenerationError::Api { status, message });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| GenerationError::InvalidResponse("no choices in response".into()))
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| GenerationError::from_transport(BACKEND, e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            Err(GenerationError::Unavailable {
                backend: BACKEND.to_string(),
                reason: format!("{status}: {}", error_message(&text)),
            })
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible embedding backend
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbedder {
    /// Create embedder producing `dims`-length vectors
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        dims: usize,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dims,
        }
    }

    /// Use a preconfigured HTTP client
    #[inline]
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty response from embeddings API".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Unavailable {
                backend: BACKEND.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::InvalidResponse(format!(
                "embeddings API error {status}: {}",
                error_message(&body)
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        let vectors: Vec<Vec<f32>> = result.data.into_iter().map(|d| d.embedding).collect();
        for v in &vectors {
            check_dimensions(self.dims, v)?;
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_api_envelope() {
        assert_eq!(
            error_message(r#"{"error":{"message":"rate limited"}}"#),
            "rate limited"
        );
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[test]
    fn debug_redacts_key() {
        let c = OpenAiCompatibleClient::new("llama-3.1-8b-instant", DEFAULT_OPENAI_COMPATIBLE_URL, "sk-secret");
        assert!(!format!("{c:?}").contains("sk-secret"));
    }

    #[test]
    fn missing_env_key_is_reported() {
        let err = api_key_from_env("TRIAGE_TEST_DEFINITELY_UNSET_KEY").unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey { .. }));
    }
}

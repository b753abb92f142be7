//! Ollama backend (local inference)
//!
//! Chat goes to `/api/chat` with streaming disabled; availability is
//! checked against the model list at `/api/tags`; embeddings use
//! `/api/embed`.

use crate::client::{ChatMessage, GenerationClient, GenerationRequest};
use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use triage_index::{check_dimensions, Embedder, EmbeddingError};

/// Default local endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const BACKEND: &str = "ollama";

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

fn trim_base(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}

/// Ollama chat client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaClient {
    /// Create client for `model` at `base_url`
    #[must_use]
    pub fn new(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: trim_base(base_url),
            model: model.into(),
            temperature: 0.1,
            max_tokens: 2048,
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies)
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

    /// Whether the server is up and lists the configured model
    pub async fn is_available(&self) -> bool {
        match self.list_models().await {
            Ok(models) => models.iter().any(|m| m.contains(&self.model)),
            Err(e) => {
                tracing::error!(error = %e, "ollama not available");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GenerationError::from_transport(BACKEND, e))?;
        if !response.status().is_success() {
            return Err(GenerationError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let tags: OllamaTags = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model: self.model.clone(),
            messages: request.messages(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature.unwrap_or(self.temperature),
                num_predict: request.max_tokens.unwrap_or(self.max_tokens),
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::from_transport(BACKEND, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status, %message, "ollama chat failed");
            return Err(GenerationError::Api { status, message });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(parsed.message.content)
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        let models = self.list_models().await?;
        if models.iter().any(|m| m.contains(&self.model)) {
            Ok(())
        } else {
            Err(GenerationError::Unavailable {
                backend: BACKEND.to_string(),
                reason: format!("model '{}' is not pulled", self.model),
            })
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Ollama embedding backend
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
    dims: usize,
}

impl OllamaEmbedder {
    /// Create embedder producing `dims`-length vectors
    #[must_use]
    pub fn new(model: impl Into<String>, base_url: impl Into<String>, dims: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: trim_base(base_url),
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

fn embed_unavailable(backend: &str, e: &reqwest::Error) -> EmbeddingError {
    EmbeddingError::Unavailable {
        backend: backend.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty response from Ollama".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/api/embed", self.base_url);
        let request = OllamaEmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| embed_unavailable(BACKEND, &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::InvalidResponse(format!(
                "Ollama API error {status}: {body}"
            )));
        }

        let result: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        for v in &result.embeddings {
            check_dimensions(self.dims, v)?;
        }
        Ok(result.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

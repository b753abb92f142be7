//! Triage configuration
//!
//! Loaded from YAML; every field has a default so an empty document is a
//! valid configuration. Two environment variables override the generation
//! backend: `TRIAGE_LLM_MODEL` and `TRIAGE_LLM_BASE_URL`.
//!
//! ```yaml
//! llm:
//!   provider: openai
//!   model: llama-3.1-8b-instant
//!   api_key_env: GROQ_API_KEY
//! storage:
//!   runbooks_dir: data/runbooks
//!   index_path: data/vector_store.db
//! pipeline:
//!   similarity_threshold: 0.3
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use triage_llm::{DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_COMPATIBLE_URL};

/// Environment variable overriding `llm.model`
pub const ENV_LLM_MODEL: &str = "TRIAGE_LLM_MODEL";
/// Environment variable overriding `llm.base_url`
pub const ENV_LLM_BASE_URL: &str = "TRIAGE_LLM_BASE_URL";

/// Generation backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Any OpenAI-compatible endpoint (Groq by default)
    #[serde(rename = "openai")]
    OpenAi,
}

/// Generation backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend kind
    pub provider: LlmProvider,
    /// Model name
    pub model: String,
    /// Endpoint; provider default when absent
    pub base_url: Option<String>,
    /// Variable holding the API key (openai provider)
    pub api_key_env: String,
    /// Default temperature
    pub temperature: f32,
    /// Default completion length
    pub max_tokens: u32,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            model: "llama3.2".to_string(),
            base_url: None,
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.1,
            max_tokens: 2048,
            request_timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Endpoint after applying the provider default
    #[must_use]
    pub fn effective_base_url(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url.as_str(),
            (None, LlmProvider::Ollama) => DEFAULT_OLLAMA_URL,
            (None, LlmProvider::OpenAi) => DEFAULT_OPENAI_COMPATIBLE_URL,
        }
    }
}

/// Embedding backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline feature hashing
    #[default]
    Hashing,
    /// Ollama `/api/embed`
    Ollama,
    /// OpenAI-compatible `/embeddings`
    #[serde(rename = "openai")]
    OpenAi,
}

/// Embedding backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend kind
    pub provider: EmbeddingProvider,
    /// Model name
    pub model: String,
    /// Endpoint; provider default when absent
    pub base_url: Option<String>,
    /// Variable holding the API key (openai provider)
    pub api_key_env: String,
    /// Vector length
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hashing,
            model: "all-minilm".to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            dimensions: 384,
        }
    }
}

impl EmbeddingConfig {
    /// Endpoint after applying the provider default
    #[must_use]
    pub fn effective_base_url(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url.as_str(),
            (None, EmbeddingProvider::OpenAi) => "https://api.openai.com/v1",
            (None, _) => DEFAULT_OLLAMA_URL,
        }
    }
}

/// File locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of `*.md` playbooks
    pub runbooks_dir: PathBuf,
    /// SQLite index file; in-memory index when absent
    pub index_path: Option<PathBuf>,
    /// Append-only feedback log
    pub feedback_file: PathBuf,
    /// Directory of golden-case JSON files
    pub golden_cases_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            runbooks_dir: PathBuf::from("data/runbooks"),
            index_path: Some(PathBuf::from("data/vector_store.db")),
            feedback_file: PathBuf::from("data/feedback.jsonl"),
            golden_cases_dir: PathBuf::from("data/golden_cases"),
        }
    }
}

/// Stage policy constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum similarity for a document to ground the analysis
    pub similarity_threshold: f32,
    /// Documents retrieved for root-cause analysis
    pub analysis_top_k: usize,
    /// Grounded documents mined for mitigation steps
    pub mitigation_top_k: usize,
    /// Default result count for ad-hoc search
    pub search_top_k: usize,
    /// Log characters shown to the classifier
    pub classification_log_chars: usize,
    /// Log characters shown to the analyser
    pub analysis_log_chars: usize,
    /// Characters of each root-cause excerpt
    pub root_cause_excerpt_chars: usize,
    /// Classifier temperature
    pub classification_temperature: f32,
    /// Classifier completion cap; backend default when absent
    pub classification_max_tokens: Option<u32>,
    /// Analyser temperature
    pub analysis_temperature: f32,
    /// Analyser completion cap
    pub analysis_max_tokens: u32,
    /// Planner temperature
    pub mitigation_temperature: f32,
    /// Planner completion cap
    pub mitigation_max_tokens: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            analysis_top_k: 3,
            mitigation_top_k: 2,
            search_top_k: 5,
            classification_log_chars: 1000,
            analysis_log_chars: 1500,
            root_cause_excerpt_chars: 500,
            classification_temperature: 0.1,
            classification_max_tokens: None,
            analysis_temperature: 0.2,
            analysis_max_tokens: 1500,
            mitigation_temperature: 0.2,
            mitigation_max_tokens: 2000,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Generation backend
    pub llm: LlmConfig,
    /// Embedding backend
    pub embedding: EmbeddingConfig,
    /// File locations
    pub storage: StorageConfig,
    /// Stage policy
    pub pipeline: PipelineConfig,
}

impl TriageConfig {
    /// Parse YAML text
    ///
    /// # Errors
    /// Schema mismatch or out-of-range values.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file
    ///
    /// # Errors
    /// Unreadable file, schema mismatch or out-of-range values.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Apply `TRIAGE_LLM_MODEL` / `TRIAGE_LLM_BASE_URL` when set
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (testable form of
    /// [`with_env_overrides`](Self::with_env_overrides))
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(model) = lookup(ENV_LLM_MODEL).filter(|v| !v.trim().is_empty()) {
            self.llm.model = model;
        }
        if let Some(url) = lookup(ENV_LLM_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.llm.base_url = Some(url);
        }
        self
    }

    /// Check ranges
    ///
    /// # Errors
    /// The first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        if !(-1.0..=1.0).contains(&p.similarity_threshold) {
            return Err(invalid(
                "pipeline.similarity_threshold",
                format!("{} is outside [-1, 1]", p.similarity_threshold),
            ));
        }
        for (field, value) in [
            ("pipeline.analysis_top_k", p.analysis_top_k),
            ("pipeline.mitigation_top_k", p.mitigation_top_k),
            ("pipeline.search_top_k", p.search_top_k),
            ("embedding.dimensions", self.embedding.dimensions),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be at least 1".to_string()));
            }
        }
        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model", "must not be empty".to_string()));
        }
        Ok(())
    }

    /// Set similarity threshold
    #[inline]
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.pipeline.similarity_threshold = threshold;
        self
    }

    /// Set playbook directory
    #[inline]
    #[must_use]
    pub fn with_runbooks_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.runbooks_dir = dir.into();
        self
    }

    /// Set index file; `None` keeps the index in memory
    #[inline]
    #[must_use]
    pub fn with_index_path(mut self, path: Option<PathBuf>) -> Self {
        self.storage.index_path = path;
        self
    }

    /// Set feedback log path
    #[inline]
    #[must_use]
    pub fn with_feedback_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.feedback_file = path.into();
        self
    }

    /// Set golden-case directory
    #[inline]
    #[must_use]
    pub fn with_golden_cases_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.golden_cases_dir = dir.into();
        self
    }

    /// Set generation backend
    #[inline]
    #[must_use]
    pub fn with_llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }

    /// Set embedding backend
    #[inline]
    #[must_use]
    pub fn with_embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.embedding = embedding;
        self
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

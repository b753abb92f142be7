//! Incident Triage Generation Backends
//!
//! A single prompt-in, text-out contract ([`GenerationClient`]) with two
//! HTTP backends, plus the matching HTTP embedders for the index.
//!
//! # Example
//!
//! ```rust,no_run
//! use triage_llm::{GenerationClient, GenerationRequest, OllamaClient};
//!
//! async fn ask() -> Result<String, triage_llm::GenerationError> {
//!     let client = OllamaClient::new("llama3.2", "http://localhost:11434");
//!     client.health_check().await?;
//!     let request = GenerationRequest::new("Summarise this alert")
//!         .with_system_prompt("You are an SRE")
//!         .with_temperature(0.1);
//!     client.generate(&request).await
//! }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod ollama;
pub mod openai;

// Re-exports
pub use client::{ChatMessage, GenerationClient, GenerationRequest};
pub use error::GenerationError;
pub use ollama::{OllamaClient, OllamaEmbedder, DEFAULT_OLLAMA_URL};
pub use openai::{
    api_key_from_env, OpenAiCompatibleClient, OpenAiEmbedder, DEFAULT_OPENAI_COMPATIBLE_URL,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for generation
    pub use crate::{GenerationClient, GenerationError, GenerationRequest};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! System bootstrap
//!
//! Builds the backends named by a [`TriageConfig`], refuses to start when
//! either backend fails its health check, loads the index and wires the
//! orchestrator.

use crate::config::{EmbeddingProvider, LlmProvider, TriageConfig};
use crate::error::TriageError;
use crate::evaluation::Evaluator;
use crate::orchestrator::Orchestrator;
use crate::tracking::{FeedbackLog, MetricsSink, SessionMetrics};
use std::sync::Arc;
use std::time::Duration;
use triage_index::{Embedder, EmbeddingIndex, HashingEmbedder, SqliteDocumentStore};
use triage_llm::{
    api_key_from_env, GenerationClient, GenerationError, OllamaClient, OllamaEmbedder,
    OpenAiCompatibleClient, OpenAiEmbedder,
};
use triage_model::{Category, IncidentContext, RetrievalResult, TriageResult};
use triage_retrieval::{DirectoryCorpus, ReindexReport, RetrievalService};

/// Fully wired triage system
pub struct TriageSystem {
    config: TriageConfig,
    generator: Arc<dyn GenerationClient>,
    retrieval: Arc<RetrievalService>,
    orchestrator: Arc<Orchestrator>,
    session: Arc<SessionMetrics>,
    feedback: FeedbackLog,
}

impl std::fmt::Debug for TriageSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageSystem")
            .field("model", &self.generator.model_name())
            .field("documents", &self.retrieval.index().len())
            .finish_non_exhaustive()
    }
}

impl TriageSystem {
    /// Build backends from `config` and start
    ///
    /// # Errors
    /// - `TriageError::Config` for invalid settings
    /// - `TriageError::BackendUnavailable` when a backend is unreachable
    /// - index open or reindex failures
    pub async fn initialize(config: TriageConfig) -> Result<Self, TriageError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm.request_timeout_secs))
            .build()
            .map_err(GenerationError::from)?;

        let generator = build_generator(&config, http.clone())?;
        let embedder = build_embedder(&config, http)?;
        Self::from_parts(config, generator, embedder).await
    }

    /// Start with caller-supplied backends
    ///
    /// Health checks, index loading and the initial reindex still run.
    ///
    /// # Errors
    /// Same as [`TriageSystem::initialize`] minus backend construction.
    pub async fn from_parts(
        config: TriageConfig,
        generator: Arc<dyn GenerationClient>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, TriageError> {
        config.validate()?;

        generator.health_check().await.map_err(|e| {
            TriageError::backend_unavailable(format!("generation/{}", generator.model_name()), e)
        })?;
        embedder.health_check().await.map_err(|e| {
            TriageError::backend_unavailable(format!("embedding/{}", embedder.model_name()), e)
        })?;
        tracing::info!(
            generation = generator.model_name(),
            embedding = embedder.model_name(),
            dims = embedder.dimensions(),
            "backends healthy"
        );

        let index = match &config.storage.index_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| TriageError::io_error(parent, e))?;
                }
                let store = SqliteDocumentStore::open(path)?;
                EmbeddingIndex::open(Arc::clone(&embedder), Arc::new(store))?
            }
            None => EmbeddingIndex::new(Arc::clone(&embedder)),
        };
        let retrieval = Arc::new(RetrievalService::new(Arc::new(index)));

        let session = Arc::new(SessionMetrics::new());
        let orchestrator = Arc::new(
            Orchestrator::new(Arc::clone(&generator), Arc::clone(&retrieval), &config.pipeline)
                .with_metrics_sink(Arc::clone(&session) as Arc<dyn MetricsSink>),
        );
        let feedback = FeedbackLog::new(config.storage.feedback_file.clone());

        let system = Self {
            config,
            generator,
            retrieval,
            orchestrator,
            session,
            feedback,
        };
        system.reindex().await?;
        Ok(system)
    }

    /// Rebuild the index from the runbook directory
    ///
    /// # Errors
    /// The index store rejects the swap.
    pub async fn reindex(&self) -> Result<ReindexReport, TriageError> {
        let corpus = DirectoryCorpus::new(self.config.storage.runbooks_dir.clone());
        let report = self.retrieval.reindex_all(&corpus).await?;
        tracing::info!(
            discovered = report.discovered,
            indexed = report.indexed,
            failed = report.failed,
            "runbooks indexed"
        );
        Ok(report)
    }

    /// Triage one incident
    ///
    /// # Errors
    /// See [`Orchestrator::triage`].
    pub async fn triage(&self, ctx: &IncidentContext) -> Result<TriageResult, TriageError> {
        self.orchestrator.triage(ctx).await
    }

    /// Search playbooks; `top_k` defaults to the configured search size
    ///
    /// # Errors
    /// Query embedding failure.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        category: Option<Category>,
    ) -> Result<Vec<RetrievalResult>, TriageError> {
        let top_k = top_k.unwrap_or(self.config.pipeline.search_top_k);
        Ok(self.retrieval.search(query, top_k, category).await?)
    }

    /// Evaluator over the configured golden cases
    #[must_use]
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(
            Arc::clone(&self.orchestrator),
            self.config.storage.golden_cases_dir.clone(),
        )
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Orchestrator
    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Retrieval service
    #[inline]
    #[must_use]
    pub fn retrieval(&self) -> &Arc<RetrievalService> {
        &self.retrieval
    }

    /// Session bookkeeping
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionMetrics {
        &self.session
    }

    /// Feedback log
    #[inline]
    #[must_use]
    pub fn feedback_log(&self) -> &FeedbackLog {
        &self.feedback
    }
}

fn build_generator(config: &TriageConfig, http: reqwest::Client) -> Result<Arc<dyn GenerationClient>, TriageError> {
    let llm = &config.llm;
    let base_url = llm.effective_base_url();
    Ok(match llm.provider {
        LlmProvider::Ollama => Arc::new(
            OllamaClient::new(&llm.model, base_url)
                .with_http_client(http)
                .with_defaults(llm.temperature, llm.max_tokens),
        ),
        LlmProvider::OpenAi => {
            let client = OpenAiCompatibleClient::from_env(&llm.model, base_url, &llm.api_key_env)
                .map_err(|e| TriageError::backend_unavailable(format!("generation/{}", llm.model), e))?;
            Arc::new(
                client
                    .with_http_client(http)
                    .with_defaults(llm.temperature, llm.max_tokens),
            )
        }
    })
}

fn build_embedder(config: &TriageConfig, http: reqwest::Client) -> Result<Arc<dyn Embedder>, TriageError> {
    let emb = &config.embedding;
    Ok(match emb.provider {
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::new(emb.dimensions)),
        EmbeddingProvider::Ollama => Arc::new(
            OllamaEmbedder::new(&emb.model, emb.effective_base_url(), emb.dimensions).with_http_client(http),
        ),
        EmbeddingProvider::OpenAi => {
            let key = api_key_from_env(&emb.api_key_env)
                .map_err(|e| TriageError::backend_unavailable(format!("embedding/{}", emb.model), e))?;
            Arc::new(
                OpenAiEmbedder::new(&emb.model, emb.effective_base_url(), key, emb.dimensions)
                    .with_http_client(http),
            )
        }
    })
}

//! Incident Triage Core
//!
//! The retrieval-grounded reasoning pipeline: classification, root-cause
//! analysis and mitigation planning, coordinated by an orchestrator that
//! assembles one [`TriageResult`] per incident.
//!
//! # Overview
//!
//! - **stages**: the three generation-backed stages, each with a fallback
//!   for unusable output
//! - **escalation**: deterministic severity floor from hard signals
//! - **orchestrator**: fixed stage sequence, timing, result assembly
//! - **system**: backend construction, health checks, index bootstrap
//! - **tracking**: session metrics and the feedback log
//! - **evaluation**: golden-case accuracy reports
//!
//! # Example
//!
//! ```rust,no_run
//! use triage_core::prelude::*;
//!
//! # async fn demo() -> Result<(), TriageError> {
//! let config = TriageConfig::from_yaml_file("config.yaml")?.with_env_overrides();
//! let system = TriageSystem::initialize(config).await?;
//!
//! let alert = IncidentAlert::from_json(r#"{
//!     "incident_id": "INC-1", "timestamp": "2024-01-15T10:30:00Z",
//!     "source": "prometheus", "alert_name": "Auth down",
//!     "description": "auth-service refusing connections"
//! }"#)?;
//! let result = system.triage(&IncidentContext::new(alert)?).await?;
//! println!("{} {}", result.severity, result.category);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod escalation;
pub mod evaluation;
pub mod orchestrator;
pub mod prompts;
pub mod render;
pub mod stages;
pub mod structured;
pub mod system;
pub mod tracking;

// Re-exports
pub use config::{
    EmbeddingConfig, EmbeddingProvider, LlmConfig, LlmProvider, PipelineConfig, StorageConfig,
    TriageConfig,
};
pub use error::{ConfigError, MetricsError, TriageError};
pub use escalation::{SeverityAssessment, SeverityPolicy};
pub use evaluation::{root_cause_overlap, CaseEvaluation, EvaluationSummary, Evaluator, GoldenCase, GroundTruth};
pub use orchestrator::{Orchestrator, TriageStage};
pub use render::render_plan;
pub use stages::{ClassificationStage, MitigationStage, RootCauseStage};
pub use structured::MalformedOutput;
pub use system::TriageSystem;
pub use tracking::{
    FeedbackLog, FeedbackRecord, MetricsSink, NoopMetrics, SessionMetrics, SessionSummary, TriageRecord,
};
pub use triage_model::{
    Category, Classification, IncidentAlert, IncidentContext, MitigationPlan, Severity, TriageResult,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for triage
    pub use crate::{
        Category, IncidentAlert, IncidentContext, Orchestrator, Severity, TriageConfig, TriageError,
        TriageResult, TriageSystem,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Orchestration of the three stages
//!
//! A run moves through a fixed sequence of stages with no branching and no
//! retries; each stage already guarantees a usable output.

use crate::config::PipelineConfig;
use crate::error::TriageError;
use crate::escalation::SeverityPolicy;
use crate::render::render_plan;
use crate::stages::{ClassificationStage, MitigationStage, RootCauseStage};
use crate::tracking::{MetricsSink, NoopMetrics};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use triage_llm::GenerationClient;
use triage_model::{IncidentContext, TriageResult};
use triage_retrieval::RetrievalService;

/// Position of a run in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriageStage {
    /// Severity and category
    Classifying,
    /// Grounded root causes
    AnalyzingRootCause,
    /// Cited action plan
    PlanningMitigation,
    /// Result assembled
    Aggregated,
}

impl TriageStage {
    /// Stage name for logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classifying => "classifying",
            Self::AnalyzingRootCause => "analyzing_root_cause",
            Self::PlanningMitigation => "planning_mitigation",
            Self::Aggregated => "aggregated",
        }
    }
}

/// Check a stage transition against the fixed order
///
/// # Errors
/// `TriageError::IllegalTransition` for anything but the next stage.
pub fn validate_transition(from: TriageStage, to: TriageStage) -> Result<(), TriageError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(TriageError::IllegalTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

/// Stages reachable from `from`
#[must_use]
pub fn allowed_transitions(from: TriageStage) -> Vec<TriageStage> {
    use TriageStage::{Aggregated, AnalyzingRootCause, Classifying, PlanningMitigation};
    match from {
        Classifying => vec![AnalyzingRootCause],
        AnalyzingRootCause => vec![PlanningMitigation],
        PlanningMitigation => vec![Aggregated],
        Aggregated => vec![],
    }
}

fn allowed(from: TriageStage, to: TriageStage) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

/// Sequences classification, root-cause analysis and mitigation planning
pub struct Orchestrator {
    classification: ClassificationStage,
    root_cause: RootCauseStage,
    mitigation: MitigationStage,
    sink: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator").finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Wire the stages to one generator and one retrieval service
    #[must_use]
    pub fn new(
        generator: Arc<dyn GenerationClient>,
        retrieval: Arc<RetrievalService>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            classification: ClassificationStage::new(Arc::clone(&generator), config.clone()),
            root_cause: RootCauseStage::new(
                Arc::clone(&generator),
                Arc::clone(&retrieval),
                config.clone(),
            ),
            mitigation: MitigationStage::new(generator, retrieval, config.clone()),
            sink: Arc::new(NoopMetrics),
        }
    }

    /// Forward results to `sink`
    #[inline]
    #[must_use]
    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the severity floor policy
    #[must_use]
    pub fn with_severity_policy(mut self, policy: SeverityPolicy) -> Self {
        self.classification = self.classification.with_policy(policy);
        self
    }

    /// Triage one incident
    ///
    /// # Errors
    /// - `TriageError::Validation` before any stage runs
    /// - generation or retrieval faults, unmodified
    pub async fn triage(&self, ctx: &IncidentContext) -> Result<TriageResult, TriageError> {
        ctx.validate()?;
        let span = tracing::info_span!("triage", incident_id = %ctx.incident_id());
        self.run(ctx).instrument(span).await
    }

    async fn run(&self, ctx: &IncidentContext) -> Result<TriageResult, TriageError> {
        let started = Instant::now();
        let mut stage = TriageStage::Classifying;
        tracing::info!(stage = stage.as_str(), "triage started");

        let classification = self.classification.classify(ctx).await?;

        advance(&mut stage, TriageStage::AnalyzingRootCause)?;
        let analysis = self
            .root_cause
            .analyze(ctx, classification.severity, classification.category)
            .await?;

        advance(&mut stage, TriageStage::PlanningMitigation)?;
        let plan = self
            .mitigation
            .plan(
                ctx,
                classification.severity,
                classification.category,
                &analysis.findings,
                &analysis.grounding,
            )
            .await?;

        let processing_time = started.elapsed();
        advance(&mut stage, TriageStage::Aggregated)?;

        let result = TriageResult {
            incident_id: ctx.incident_id().to_string(),
            severity: classification.severity,
            category: classification.category,
            confidence: classification.confidence,
            root_causes: analysis.causes(),
            mitigation_plan: render_plan(&plan),
            relevant_documents: analysis.grounding.iter().map(|hit| hit.reference()).collect(),
            citations: plan.citations,
            reasoning: classification.reasoning,
            processing_time,
            created_at: Utc::now(),
        };

        ::metrics::counter!(
            "triage_runs_total",
            "severity" => result.severity.as_str(),
            "category" => result.category.as_str()
        )
        .increment(1);
        ::metrics::histogram!("triage_processing_seconds").record(result.processing_secs());

        if let Err(e) = self.sink.record_triage(&result) {
            tracing::warn!(error = %e, "metrics sink failed, result kept");
        }

        tracing::info!(
            severity = %result.severity,
            category = %result.category,
            grounded = result.is_grounded(),
            elapsed_ms = u64::try_from(processing_time.as_millis()).unwrap_or(u64::MAX),
            "triage completed"
        );
        Ok(result)
    }
}

fn advance(stage: &mut TriageStage, next: TriageStage) -> Result<(), TriageError> {
    validate_transition(*stage, next)?;
    tracing::debug!(from = stage.as_str(), to = next.as_str(), "stage transition");
    *stage = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use TriageStage::{Aggregated, AnalyzingRootCause, Classifying, PlanningMitigation};

    #[test]
    fn stages_advance_in_fixed_order() {
        assert!(validate_transition(Classifying, AnalyzingRootCause).is_ok());
        assert!(validate_transition(AnalyzingRootCause, PlanningMitigation).is_ok());
        assert!(validate_transition(PlanningMitigation, Aggregated).is_ok());
    }

    #[test]
    fn skipping_or_rewinding_is_rejected() {
        assert!(validate_transition(Classifying, PlanningMitigation).is_err());
        assert!(validate_transition(PlanningMitigation, Classifying).is_err());
        assert!(allowed_transitions(Aggregated).is_empty());
        let err = validate_transition(Aggregated, Classifying).unwrap_err();
        assert_eq!(err.to_string(), "illegal stage transition: aggregated -> classifying");
    }
}

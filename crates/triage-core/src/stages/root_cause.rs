//! Grounded root-cause analysis

use super::{non_blank, note_fallback};
use crate::config::PipelineConfig;
use crate::error::TriageError;
use crate::prompts;
use crate::structured::{extract_json_object, score_value, MalformedOutput};
use serde_json::Value;
use std::sync::Arc;
use triage_llm::{GenerationClient, GenerationRequest};
use triage_model::{Category, IncidentContext, RetrievalResult, RootCauseAnalysis, RootCauseFinding, Severity};
use triage_retrieval::{root_cause_excerpt, RetrievalService};

/// Likelihood assigned when a finding omits one
const DEFAULT_LIKELIHOOD: f64 = 0.5;

/// Retrieves grounding playbooks and proposes ranked root causes
pub struct RootCauseStage {
    generator: Arc<dyn GenerationClient>,
    retrieval: Arc<RetrievalService>,
    config: PipelineConfig,
}

impl RootCauseStage {
    /// Create stage
    #[must_use]
    pub fn new(
        generator: Arc<dyn GenerationClient>,
        retrieval: Arc<RetrievalService>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            generator,
            retrieval,
            config,
        }
    }

    /// Analyse one classified incident
    ///
    /// Only documents at or above the similarity threshold ground the
    /// prompt and appear in the result. With none qualifying the analysis
    /// runs ungrounded.
    ///
    /// # Errors
    /// Query embedding or generation transport failures.
    pub async fn analyze(
        &self,
        ctx: &IncidentContext,
        severity: Severity,
        category: Category,
    ) -> Result<RootCauseAnalysis, TriageError> {
        let threshold = self.config.similarity_threshold;
        let hits = self
            .retrieval
            .search(
                &prompts::grounding_query(&ctx.alert),
                self.config.analysis_top_k,
                Some(category),
            )
            .await?;
        let retrieved = hits.len();
        let grounding: Vec<RetrievalResult> = hits.into_iter().filter(|h| h.meets(threshold)).collect();

        if grounding.is_empty() {
            tracing::info!(retrieved, threshold, "no playbook above threshold, analysing ungrounded");
        } else {
            tracing::debug!(retrieved, grounded = grounding.len(), "grounding selected");
        }

        let excerpts: Vec<(String, f32, Option<String>)> = grounding
            .iter()
            .map(|hit| {
                let section = root_cause_excerpt(&hit.document.content)
                    .map(|s| prompts::excerpt(&s, self.config.root_cause_excerpt_chars));
                (hit.document.title.clone(), hit.similarity, section)
            })
            .collect();
        let context = prompts::root_cause_context(&excerpts, threshold);

        let request = GenerationRequest::new(prompts::root_cause_prompt(
            ctx,
            severity,
            category,
            self.config.analysis_log_chars,
            &context,
        ))
        .with_system_prompt(prompts::ROOT_CAUSE_SYSTEM_PROMPT)
        .with_temperature(self.config.analysis_temperature)
        .with_max_tokens(self.config.analysis_max_tokens);

        let response = self.generator.generate(&request).await?;
        let analysis = match interpret(&response) {
            Ok((findings, primary_cause, reasoning)) => RootCauseAnalysis {
                findings,
                primary_cause,
                reasoning,
                grounding,
                degraded: false,
            },
            Err(err) => {
                note_fallback("root_cause", &err, &response);
                fallback()
            }
        };

        tracing::info!(
            findings = analysis.findings.len(),
            grounded = analysis.grounding.len(),
            primary = %analysis.primary_cause,
            "root causes identified"
        );
        Ok(analysis)
    }
}

/// Analysis used when the response cannot be parsed
#[must_use]
pub fn fallback() -> RootCauseAnalysis {
    RootCauseAnalysis {
        findings: vec![RootCauseFinding::new(
            "Unable to determine - analysis failed",
            0.3,
            "LLM response parsing error",
        )],
        primary_cause: "Unknown".to_string(),
        reasoning: "Root cause analysis failed".to_string(),
        grounding: Vec::new(),
        degraded: true,
    }
}

/// Parse findings, primary cause and reasoning
///
/// Findings are ranked by likelihood, keeping generated order on ties.
/// Entries without a cause are dropped.
///
/// # Errors
/// `MalformedOutput` when there is no JSON object or no usable finding.
pub fn interpret(response: &str) -> Result<(Vec<RootCauseFinding>, String, String), MalformedOutput> {
    let map = extract_json_object(response)?;
    let Some(Value::Array(entries)) = map.get("root_causes") else {
        return Err(MalformedOutput::MissingField { field: "root_causes" });
    };

    let mut findings: Vec<RootCauseFinding> = entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(obj) => {
                let cause = non_blank(obj.get("cause"))?;
                let likelihood = obj
                    .get("likelihood")
                    .and_then(score_value)
                    .unwrap_or(DEFAULT_LIKELIHOOD);
                let evidence = non_blank(obj.get("evidence")).unwrap_or_default();
                Some(RootCauseFinding::new(cause, likelihood, evidence))
            }
            Value::String(s) if !s.trim().is_empty() => {
                Some(RootCauseFinding::new(s.trim(), DEFAULT_LIKELIHOOD, ""))
            }
            _ => None,
        })
        .collect();
    if findings.is_empty() {
        return Err(MalformedOutput::MissingField { field: "root_causes" });
    }
    findings.sort_by(|a, b| b.likelihood.total_cmp(&a.likelihood));

    let primary = non_blank(map.get("primary_cause")).unwrap_or_else(|| findings[0].cause.clone());
    let reasoning = non_blank(map.get("reasoning")).unwrap_or_default();
    Ok((findings, primary, reasoning))
}

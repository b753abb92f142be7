//! Cited mitigation planning

use super::{non_blank, note_fallback};
use crate::config::PipelineConfig;
use crate::error::TriageError;
use crate::prompts;
use crate::structured::{extract_json_object, MalformedOutput};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::sync::Arc;
use triage_llm::{GenerationClient, GenerationRequest};
use triage_model::{
    Category, EscalationPolicy, IncidentContext, InvestigationStep, MitigationAction, MitigationPlan,
    RetrievalResult, RootCauseFinding, Severity,
};
use triage_retrieval::{mitigation_excerpt, RetrievalService};

/// Placeholder commands models emit instead of omitting the field
const NO_COMMAND: [&str; 5] = ["null", "none", "n/a", "na", "-"];

/// Produces a prioritised, cited action plan
pub struct MitigationStage {
    generator: Arc<dyn GenerationClient>,
    retrieval: Arc<RetrievalService>,
    config: PipelineConfig,
}

impl MitigationStage {
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

    /// Plan mitigation for the analysed incident
    ///
    /// Mitigation sections of the top grounded playbooks feed the prompt.
    /// Citations merge action and step citations with the titles of all
    /// grounded playbooks.
    ///
    /// # Errors
    /// Generation transport failures.
    pub async fn plan(
        &self,
        ctx: &IncidentContext,
        severity: Severity,
        category: Category,
        findings: &[RootCauseFinding],
        grounding: &[RetrievalResult],
    ) -> Result<MitigationPlan, TriageError> {
        let mut sections = Vec::new();
        for hit in grounding.iter().take(self.config.mitigation_top_k) {
            let Some(content) = self.retrieval.get_by_path(&hit.document.path).await else {
                continue;
            };
            if let Some(section) = mitigation_excerpt(&content) {
                sections.push((hit.document.title.clone(), section));
            }
        }
        tracing::debug!(playbooks = sections.len(), "mitigation excerpts collected");

        let request = GenerationRequest::new(prompts::mitigation_prompt(
            ctx,
            severity,
            category,
            findings,
            &prompts::mitigation_context(&sections),
        ))
        .with_system_prompt(prompts::MITIGATION_SYSTEM_PROMPT)
        .with_temperature(self.config.mitigation_temperature)
        .with_max_tokens(self.config.mitigation_max_tokens);

        let response = self.generator.generate(&request).await?;
        let plan = interpret(&response, grounding).unwrap_or_else(|err| {
            note_fallback("mitigation", &err, &response);
            MitigationPlan::fallback()
        });

        tracing::info!(
            actions = plan.immediate_actions.len(),
            investigation = plan.investigation_steps.len(),
            citations = plan.citations.len(),
            "mitigation plan generated"
        );
        Ok(plan)
    }
}

/// Parse a plan and merge its citations
///
/// # Errors
/// `MalformedOutput` when there is no JSON object or no usable immediate
/// action.
pub fn interpret(response: &str, grounding: &[RetrievalResult]) -> Result<MitigationPlan, MalformedOutput> {
    let map = extract_json_object(response)?;

    let immediate_actions: Vec<MitigationAction> = objects(&map, "immediate_actions")
        .filter_map(|obj| {
            Some(MitigationAction {
                step: non_blank(obj.get("step"))?,
                command: non_blank(obj.get("command"))
                    .filter(|c| !NO_COMMAND.contains(&c.to_ascii_lowercase().as_str())),
                expected_outcome: non_blank(obj.get("expected_outcome")).unwrap_or_default(),
                citation: non_blank(obj.get("citation")),
            })
        })
        .collect();
    if immediate_actions.is_empty() {
        return Err(MalformedOutput::MissingField {
            field: "immediate_actions",
        });
    }

    let investigation_steps: Vec<InvestigationStep> = objects(&map, "investigation_steps")
        .filter_map(|obj| {
            Some(InvestigationStep {
                step: non_blank(obj.get("step"))?,
                citation: non_blank(obj.get("citation")),
            })
        })
        .collect();

    let escalation = match map.get("escalation") {
        Some(Value::Object(obj)) => EscalationPolicy {
            when: non_blank(obj.get("when")).unwrap_or_default(),
            who: non_blank(obj.get("who")).unwrap_or_default(),
            channel: non_blank(obj.get("channel")).unwrap_or_default(),
        },
        _ => EscalationPolicy::default(),
    };

    let citations: IndexSet<String> = immediate_actions
        .iter()
        .filter_map(|a| a.citation.clone())
        .chain(investigation_steps.iter().filter_map(|s| s.citation.clone()))
        .chain(grounding.iter().map(|hit| hit.document.title.clone()))
        .collect();

    Ok(MitigationPlan {
        immediate_actions,
        investigation_steps,
        escalation,
        summary: non_blank(map.get("summary")).unwrap_or_default(),
        citations: citations.into_iter().collect(),
    })
}

fn objects<'a>(map: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    map.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_model::DocumentRecord;

    fn hit(title: &str) -> RetrievalResult {
        RetrievalResult::new(
            Arc::new(DocumentRecord::new(
                format!("runbooks/{title}.md"),
                title,
                "",
                Category::Database,
                vec![1.0],
            )),
            0.8,
        )
    }

    const PLAN: &str = r##"{
        "immediate_actions": [
            {"step": "Restart pgbouncer", "command": "systemctl restart pgbouncer",
             "expected_outcome": "pool drains", "citation": "DB pool exhaustion"},
            {"step": "Scale replicas", "command": "N/A", "expected_outcome": "load spreads", "citation": null}
        ],
        "investigation_steps": [
            {"step": "Check slow query log", "citation": "Slow queries"},
            {"step": "Look for leaked connections", "citation": "DB pool exhaustion"}
        ],
        "escalation": {"when": "pool still full after 15m", "who": "DBA on-call", "channel": "#db-incidents"},
        "summary": "Drain the pool and find the leak"
    }"##;

    #[test]
    fn citations_merge_in_first_seen_order() {
        let plan = interpret(PLAN, &[hit("Postgres runbook"), hit("Slow queries")]).unwrap();
        assert_eq!(
            plan.citations,
            vec!["DB pool exhaustion", "Slow queries", "Postgres runbook"]
        );
    }

    #[test]
    fn placeholder_commands_are_dropped() {
        let plan = interpret(PLAN, &[]).unwrap();
        assert_eq!(plan.immediate_actions[0].command.as_deref(), Some("systemctl restart pgbouncer"));
        assert_eq!(plan.immediate_actions[1].command, None);
        assert_eq!(plan.immediate_actions[1].citation, None);
        assert_eq!(plan.escalation.who, "DBA on-call");
        assert_eq!(plan.escalation.channel, "#db-incidents");
    }

    #[test]
    fn missing_escalation_uses_default() {
        let plan = interpret(r#"{"immediate_actions": [{"step": "Page DBA"}]}"#, &[]).unwrap();
        assert_eq!(plan.escalation, EscalationPolicy::default());
        assert!(plan.investigation_steps.is_empty());
        assert!(plan.citations.is_empty());
    }

    #[test]
    fn plan_without_actions_is_malformed() {
        assert_eq!(
            interpret(r#"{"immediate_actions": [], "summary": "nothing"}"#, &[]).unwrap_err(),
            MalformedOutput::MissingField { field: "immediate_actions" }
        );
        assert!(interpret("no plan today", &[]).is_err());
    }
}

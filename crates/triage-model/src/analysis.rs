//! Root-cause findings and mitigation plans
//!
//! These are the intermediate outputs of the analysis and planning stages.
//! They are consumed by the orchestrator and discarded once aggregated.

use crate::classification::clamp_unit;
use crate::document::RetrievalResult;
use serde::{Deserialize, Serialize};

/// One candidate root cause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseFinding {
    /// Description of the cause
    pub cause: String,
    /// Likelihood in [0, 1]
    pub likelihood: f64,
    /// Data supporting the cause
    pub evidence: String,
}

impl RootCauseFinding {
    /// Create finding; likelihood is clamped to [0, 1]
    #[must_use]
    pub fn new(cause: impl Into<String>, likelihood: f64, evidence: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
            likelihood: clamp_unit(likelihood),
            evidence: evidence.into(),
        }
    }
}

/// Output of the root-cause stage
#[derive(Debug, Clone)]
pub struct RootCauseAnalysis {
    /// Ranked findings, never empty
    pub findings: Vec<RootCauseFinding>,
    /// Most likely cause
    pub primary_cause: String,
    /// Overall reasoning
    pub reasoning: String,
    /// Documents above the relevance threshold used as grounding
    pub grounding: Vec<RetrievalResult>,
    /// Whether the generated output had to be replaced by the fallback
    pub degraded: bool,
}

impl RootCauseAnalysis {
    /// Finding descriptions in rank order
    #[must_use]
    pub fn causes(&self) -> Vec<String> {
        self.findings.iter().map(|f| f.cause.clone()).collect()
    }

    /// Whether any document grounded the analysis
    #[inline]
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        !self.grounding.is_empty()
    }
}

/// Immediate remediation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationAction {
    /// What to do
    pub step: String,
    /// Shell command, when one applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// What should happen afterwards
    pub expected_outcome: String,
    /// Supporting playbook reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

/// Follow-up investigation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationStep {
    /// What to look at
    pub step: String,
    /// Supporting playbook reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

/// Who to escalate to, when and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Trigger condition
    pub when: String,
    /// Owning party
    pub who: String,
    /// Communication channel
    pub channel: String,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            when: "If issue persists after 30 minutes".to_string(),
            who: "On-call engineer".to_string(),
            channel: "#incidents".to_string(),
        }
    }
}

/// Cited, prioritised action plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationPlan {
    /// Ordered immediate actions
    pub immediate_actions: Vec<MitigationAction>,
    /// Ordered investigation steps
    pub investigation_steps: Vec<InvestigationStep>,
    /// Escalation block
    pub escalation: EscalationPolicy,
    /// One-paragraph summary
    pub summary: String,
    /// Deduplicated citations in first-seen order
    pub citations: Vec<String>,
}

impl MitigationPlan {
    /// Plan used when generated output cannot be parsed
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            immediate_actions: vec![MitigationAction {
                step: "Review incident details manually".to_string(),
                command: None,
                expected_outcome: "Better understanding of the issue".to_string(),
                citation: Some("Default fallback".to_string()),
            }],
            investigation_steps: Vec::new(),
            escalation: EscalationPolicy::default(),
            summary: "Mitigation plan generation failed - manual intervention required"
                .to_string(),
            citations: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding_clamps_likelihood() {
        assert_eq!(RootCauseFinding::new("x", -0.5, "").likelihood, 0.0);
        assert_eq!(RootCauseFinding::new("x", 3.0, "").likelihood, 1.0);
    }

    #[test]
    fn fallback_plan_shape() {
        let plan = MitigationPlan::fallback();
        assert_eq!(plan.immediate_actions.len(), 1);
        assert!(plan.immediate_actions[0].command.is_none());
        assert!(plan.investigation_steps.is_empty());
        assert!(plan.citations.is_empty());
        assert_eq!(plan.escalation.when, "If issue persists after 30 minutes");
    }
}

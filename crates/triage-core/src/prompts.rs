//! Prompt text for the three reasoning stages
//!
//! System prompts carry the decision policy; user prompts are built from the
//! incident and whatever grounding the stage retrieved.

use std::fmt::Write as _;
use triage_model::{truncate_chars, Category, IncidentAlert, IncidentContext, RootCauseFinding, Severity};

/// Severity and category decision policy
pub const CLASSIFICATION_SYSTEM_PROMPT: &str = r#"You are an expert SRE incident classifier. Focus on BUSINESS IMPACT, not just metrics.

Severity Classification (check ALL signals, not just one metric):

SEV1 (Critical) - Customer-impacting outage:
INDICATORS:
- Auth/payment/checkout services DOWN or degraded
- Error rate >5% on customer-facing endpoints
- Any "Connection refused", "Service unavailable", "Redis/DB down" in logs
- Failed transactions/requests >100/min
- Words: "unavailable", "down", "refused", "critical"
BUSINESS IMPACT: Revenue loss, customer complaints, SLA breach
EXAMPLE: "Auth service Redis down, 8.5% error rate, 1310 failed req/min" = SEV1

SEV2 (High) - Major degradation:
INDICATORS:
- Connection pool >85% utilized OR connection errors present
- Resource exhaustion approaching (>85% CPU/memory)
- Consumer lag >30,000 messages
- Error rate 2-5% or response time >3x normal
- Affects multiple services
- Words: "exhausted", "timeout", "lag increasing"
BUSINESS IMPACT: Partial functionality loss, some users affected
EXAMPLE: "DB pool 95/100, connection timeouts" = SEV2

SEV3 (Medium) - Performance degradation:
INDICATORS:
- Resource usage 70-85%
- Slow response times but no errors
- Consumer lag 10,000-30,000 messages
- Error rate <2%
- Limited user impact
BUSINESS IMPACT: Noticeable but manageable
EXAMPLE: "API latency 2x normal, no errors" = SEV3

SEV4 (Low) - Minor/internal:
- Internal tools only
- No customer impact
- Cosmetic issues

CRITICAL RULES:
1. Auth/Payment/Checkout DOWN = always SEV1 (even if error rate <10%)
2. Database connection issues + errors = SEV2 minimum
3. Any "refused", "unavailable", "down" in auth/payment context = SEV1
4. Multiple affected services = upgrade severity by 1 level
5. When in doubt between SEV1/SEV2, choose SEV1 if customer-facing

Categories (use exactly one of these labels):
- Database: PostgreSQL, MySQL, connection pools, queries
- API/Service: REST APIs, microservices, auth, gateway
- Infrastructure: CPU, memory, disk, nodes, orchestration
- Network: DNS, load balancers, firewalls, packet loss
- Security: certificates, authentication attacks, intrusion
- Performance: Latency, throughput (non-specific)
- Data Pipeline: Kafka, queues, ETL, stream processing
- Frontend: web and mobile clients, CDN assets

Respond with JSON only:
{
  "severity": "SEV1|SEV2|SEV3|SEV4",
  "category": "<category>",
  "confidence": 0.0-1.0,
  "reasoning": "<cite specific metrics and business impact>"
}"#;

/// Root-cause analysis instructions and output schema
pub const ROOT_CAUSE_SYSTEM_PROMPT: &str = r#"You are an expert SRE performing root cause analysis. Analyze the incident and identify the most likely root causes based on:
1. The alert metrics and description
2. Error patterns in logs
3. Known issues from runbooks

Be specific and evidence-based. Cite concrete indicators from the data.

Respond with JSON only:
{
  "root_causes": [
    {
      "cause": "<specific root cause>",
      "likelihood": 0.0-1.0,
      "evidence": "<what in the data suggests this>"
    }
  ],
  "primary_cause": "<most likely root cause>",
  "reasoning": "<overall analysis>"
}"#;

/// Mitigation planning instructions and output schema
pub const MITIGATION_SYSTEM_PROMPT: &str = r#"You are an expert SRE creating an incident mitigation plan. Your plan should be:
1. ACTIONABLE: Specific commands/steps, not vague suggestions
2. PRIORITIZED: Most critical steps first
3. CITED: Reference runbooks for each step
4. SAFE: Include rollback/validation steps

Respond with JSON only:
{
  "immediate_actions": [
    {
      "step": "<specific action>",
      "command": "<actual command if applicable>",
      "expected_outcome": "<what should happen>",
      "citation": "<runbook reference>"
    }
  ],
  "investigation_steps": [
    {
      "step": "<investigation action>",
      "citation": "<runbook reference>"
    }
  ],
  "escalation": {
    "when": "<conditions for escalation>",
    "who": "<team/person to escalate to>",
    "channel": "<communication channel>"
  },
  "summary": "<concise action plan summary>"
}"#;

/// Classification request for one incident
#[must_use]
pub fn classification_prompt(ctx: &IncidentContext, log_chars: usize) -> String {
    let alert = &ctx.alert;
    let mut out = String::from("Incident Alert:\n");
    let _ = writeln!(out, "- Alert Name: {}", alert.alert_name);
    let _ = writeln!(out, "- Description: {}", alert.description);
    let _ = writeln!(out, "- Source: {}", alert.source);
    let _ = writeln!(out, "- Affected Services: {}", alert.affected_services.join(", "));
    let _ = writeln!(out, "- Environment: {}", alert.environment);
    let _ = writeln!(out, "- Tags: {}", alert.tags.join(", "));
    let _ = write!(out, "\nMetrics:\n{}\n", metrics_json(alert));

    if let Some(logs) = ctx.log_prefix(log_chars) {
        let _ = write!(out, "\nRecent Logs:\n{logs}\n");
    }
    if let Some(extra) = &ctx.additional_context {
        let _ = write!(out, "\nAdditional Context:\n{extra}\n");
    }
    out.push_str("\nClassify this incident:");
    out
}

/// Search text used to retrieve grounding playbooks
#[must_use]
pub fn grounding_query(alert: &IncidentAlert) -> String {
    format!("{} {}", alert.alert_name, alert.description)
}

/// Root-cause grounding block
///
/// `excerpts` pairs each qualifying document's title and similarity with
/// its root-cause section, if it has one.
#[must_use]
pub fn root_cause_context(excerpts: &[(String, f32, Option<String>)], threshold: f32) -> String {
    if excerpts.is_empty() {
        return format!(
            "--- No matching runbooks found (similarity < {:.0}%). Using general SRE knowledge. ---",
            threshold * 100.0
        );
    }
    let mut out = String::from("--- RELEVANT RUNBOOKS ---\n");
    for (i, (title, similarity, section)) in excerpts.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {title} (Similarity: {similarity:.2})", i + 1);
        if let Some(section) = section {
            let _ = writeln!(out, "{section}...");
        }
    }
    out
}

/// Root-cause request
#[must_use]
pub fn root_cause_prompt(
    ctx: &IncidentContext,
    severity: Severity,
    category: Category,
    log_chars: usize,
    grounding: &str,
) -> String {
    let alert = &ctx.alert;
    let mut out = String::from("Incident Details:\n");
    let _ = writeln!(out, "- Alert: {}", alert.alert_name);
    let _ = writeln!(out, "- Description: {}", alert.description);
    let _ = writeln!(out, "- Severity: {severity}");
    let _ = writeln!(out, "- Category: {category}");
    let _ = writeln!(out, "- Affected Services: {}", alert.affected_services.join(", "));
    let _ = write!(out, "\nMetrics:\n{}\n", metrics_json(alert));
    let logs = ctx.log_prefix(log_chars).unwrap_or("No logs available");
    let _ = write!(out, "\nLogs:\n{logs}\n");
    let _ = write!(out, "\n{grounding}\n");
    out.push_str("\nAnalyze and identify root causes:");
    out
}

/// Mitigation grounding block from `(title, mitigation section)` pairs
#[must_use]
pub fn mitigation_context(sections: &[(String, String)]) -> String {
    if sections.is_empty() {
        return String::new();
    }
    let mut out = String::from("--- MITIGATION STEPS FROM RUNBOOKS ---\n");
    for (title, section) in sections {
        let _ = write!(out, "\nFrom: {title}\n{section}\n");
    }
    out
}

/// Mitigation request
#[must_use]
pub fn mitigation_prompt(
    ctx: &IncidentContext,
    severity: Severity,
    category: Category,
    findings: &[RootCauseFinding],
    grounding: &str,
) -> String {
    let alert = &ctx.alert;
    let mut out = String::from("Incident Context:\n");
    let _ = writeln!(out, "- Alert: {}", alert.alert_name);
    let _ = writeln!(out, "- Severity: {severity}");
    let _ = writeln!(out, "- Category: {category}");
    let _ = writeln!(out, "- Affected Services: {}", alert.affected_services.join(", "));
    out.push_str("\nRoot Causes Identified:\n");
    for finding in findings {
        let _ = writeln!(
            out,
            "- {} (likelihood: {:.0}%)",
            finding.cause,
            finding.likelihood * 100.0
        );
    }
    let _ = write!(out, "\nMetrics:\n{}\n", metrics_json(alert));
    if !grounding.is_empty() {
        let _ = write!(out, "\n{grounding}\n");
    }
    out.push_str("\nGenerate a detailed mitigation plan:");
    out
}

fn metrics_json(alert: &IncidentAlert) -> String {
    serde_json::to_string_pretty(&alert.metrics).unwrap_or_else(|_| "{}".to_string())
}

/// Cut an excerpt to `max_chars`
#[must_use]
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    truncate_chars(text.trim(), max_chars).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> IncidentContext {
        let alert = IncidentAlert::new("INC-7", "2024-01-15T10:30:00Z", "datadog", "Auth errors", "login failing")
            .with_service("auth-service")
            .with_service("api-gateway")
            .with_tag("customer-facing")
            .with_metric("error_rate", 8.5);
        IncidentContext::new(alert).unwrap()
    }

    #[test]
    fn classification_prompt_lists_fields_and_truncates_logs() {
        let logs = "x".repeat(50);
        let prompt = classification_prompt(&ctx().with_logs(logs).with_additional_context("deploy at 10:00"), 10);
        assert!(prompt.starts_with("Incident Alert:\n- Alert Name: Auth errors\n"));
        assert!(prompt.contains("- Affected Services: auth-service, api-gateway\n"));
        assert!(prompt.contains("\"error_rate\": 8.5"));
        assert!(prompt.contains(&format!("Recent Logs:\n{}\n", "x".repeat(10))));
        assert!(!prompt.contains(&"x".repeat(11)));
        assert!(prompt.contains("Additional Context:\ndeploy at 10:00"));
        assert!(prompt.ends_with("Classify this incident:"));
    }

    #[test]
    fn root_cause_prompt_without_logs_says_so() {
        let prompt = root_cause_prompt(&ctx(), Severity::Sev1, Category::ApiService, 1500, "");
        assert!(prompt.contains("- Severity: SEV1\n- Category: API/Service\n"));
        assert!(prompt.contains("Logs:\nNo logs available\n"));
    }

    #[test]
    fn ungrounded_context_mentions_threshold() {
        assert_eq!(
            root_cause_context(&[], 0.3),
            "--- No matching runbooks found (similarity < 30%). Using general SRE knowledge. ---"
        );
    }

    #[test]
    fn grounded_context_numbers_documents() {
        let text = root_cause_context(
            &[
                ("Redis outage".into(), 0.82, Some("Memory eviction".into())),
                ("Auth latency".into(), 0.41, None),
            ],
            0.3,
        );
        assert!(text.contains("1. Redis outage (Similarity: 0.82)\nMemory eviction...\n"));
        assert!(text.contains("2. Auth latency (Similarity: 0.41)\n"));
    }

    #[test]
    fn mitigation_prompt_renders_likelihood_percent() {
        let findings = [RootCauseFinding::new("Redis down", 0.85, "refused")];
        let prompt = mitigation_prompt(&ctx(), Severity::Sev1, Category::ApiService, &findings, "");
        assert!(prompt.contains("- Redis down (likelihood: 85%)\n"));
        assert!(prompt.ends_with("Generate a detailed mitigation plan:"));
    }
}

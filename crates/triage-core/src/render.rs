//! Markdown rendering of mitigation plans

use std::fmt::Write as _;
use triage_model::MitigationPlan;

/// Render a plan as one display document
///
/// Order: immediate actions (with commands and sources), investigation
/// steps when there are any, then the escalation block.
#[must_use]
pub fn render_plan(plan: &MitigationPlan) -> String {
    let mut out = String::from("## Immediate Actions\n\n");

    for (i, action) in plan.immediate_actions.iter().enumerate() {
        let _ = writeln!(out, "**{}. {}**", i + 1, action.step);
        if let Some(command) = &action.command {
            let _ = writeln!(out, "```bash\n{command}\n```");
        }
        let _ = writeln!(out, "Expected: {}", action.expected_outcome);
        if let Some(citation) = &action.citation {
            let _ = writeln!(out, "Source: {citation}");
        }
        out.push('\n');
    }

    if !plan.investigation_steps.is_empty() {
        out.push_str("\n## Investigation Steps\n\n");
        for (i, step) in plan.investigation_steps.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, step.step);
            if let Some(citation) = &step.citation {
                let _ = writeln!(out, "   Source: {citation}");
            }
        }
    }

    let esc = &plan.escalation;
    out.push_str("\n## Escalation\n\n");
    let _ = writeln!(out, "**When:** {}", or_default(&esc.when, "As needed"));
    let _ = writeln!(out, "**Who:** {}", or_default(&esc.who, "On-call team"));
    let _ = writeln!(out, "**Channel:** {}", or_default(&esc.channel, "#incidents"));
    out
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use triage_model::{EscalationPolicy, InvestigationStep, MitigationAction};

    #[test]
    fn full_plan_layout() {
        let plan = MitigationPlan {
            immediate_actions: vec![
                MitigationAction {
                    step: "Restart Redis".into(),
                    command: Some("kubectl rollout restart deploy/redis".into()),
                    expected_outcome: "auth recovers".into(),
                    citation: Some("Redis outage".into()),
                },
                MitigationAction {
                    step: "Announce incident".into(),
                    command: None,
                    expected_outcome: "stakeholders informed".into(),
                    citation: None,
                },
            ],
            investigation_steps: vec![InvestigationStep {
                step: "Check eviction stats".into(),
                citation: Some("Redis outage".into()),
            }],
            escalation: EscalationPolicy {
                when: "no recovery in 10m".into(),
                who: "Platform on-call".into(),
                channel: String::new(),
            },
            summary: "Restart and watch".into(),
            citations: vec!["Redis outage".into()],
        };

        let expected = "## Immediate Actions\n\n\
**1. Restart Redis**\n\
```bash\nkubectl rollout restart deploy/redis\n```\n\
Expected: auth recovers\n\
Source: Redis outage\n\n\
**2. Announce incident**\n\
Expected: stakeholders informed\n\n\
\n## Investigation Steps\n\n\
1. Check eviction stats\n   Source: Redis outage\n\
\n## Escalation\n\n\
**When:** no recovery in 10m\n\
**Who:** Platform on-call\n\
**Channel:** #incidents\n";
        assert_eq!(render_plan(&plan), expected);
    }

    #[test]
    fn investigation_section_omitted_when_empty() {
        let text = render_plan(&MitigationPlan::fallback());
        assert!(!text.contains("Investigation Steps"));
        assert!(text.contains("**1. Review incident details manually**\n"));
        assert!(text.contains("Source: Default fallback\n"));
        assert!(text.ends_with("**Channel:** #incidents\n"));
    }
}

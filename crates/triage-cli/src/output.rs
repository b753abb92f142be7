//! Plain-text renderings for terminal output

use std::fmt::Write;
use std::sync::Arc;
use triage_core::EvaluationSummary;
use triage_model::{DocumentRecord, RetrievalResult, TriageResult};

pub(crate) fn search_hits(hits: &[RetrievalResult]) -> String {
    if hits.is_empty() {
        return "No matching playbooks\n".to_string();
    }
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} [{}] similarity {:.2}\n   {}",
            i + 1,
            hit.document.title,
            hit.document.category,
            hit.similarity,
            hit.document.path
        );
    }
    out
}

pub(crate) fn runbook_list(docs: &[Arc<DocumentRecord>]) -> String {
    if docs.is_empty() {
        return "No playbooks indexed\n".to_string();
    }
    let mut out = String::new();
    for doc in docs {
        let _ = writeln!(out, "{:<16} {}  ({})", doc.category.as_str(), doc.title, doc.path);
    }
    let _ = writeln!(out, "\n{} playbooks", docs.len());
    out
}

pub(crate) fn triage_summary(result: &TriageResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Incident:   {}", result.incident_id);
    let _ = writeln!(out, "Severity:   {}", result.severity);
    let _ = writeln!(out, "Category:   {}", result.category);
    let _ = writeln!(out, "Confidence: {:.0}%", result.confidence * 100.0);
    let _ = writeln!(out, "Reasoning:  {}", result.reasoning);

    out.push_str("\nRoot causes:\n");
    for cause in &result.root_causes {
        let _ = writeln!(out, "- {cause}");
    }

    if result.relevant_documents.is_empty() {
        out.push_str("\nNo playbook matched; plan uses general knowledge\n");
    } else {
        out.push_str("\nGrounded on:\n");
        for doc in &result.relevant_documents {
            let _ = writeln!(out, "- {} ({:.2})", doc.title, doc.similarity);
        }
    }

    let _ = writeln!(out, "\n{}", result.mitigation_plan.trim_end());
    let _ = writeln!(out, "\nProcessed in {:.2}s", result.processing_secs());
    out
}

pub(crate) fn evaluation(summary: &EvaluationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Cases:                {}", summary.total_cases);
    let _ = writeln!(out, "Severity accuracy:    {:.1}%", summary.severity_accuracy * 100.0);
    let _ = writeln!(out, "Category accuracy:    {:.1}%", summary.category_accuracy * 100.0);
    let _ = writeln!(out, "Root cause overlap:   {:.1}%", summary.avg_root_cause_precision * 100.0);
    let _ = writeln!(out, "Avg processing time:  {:.2}s", summary.avg_processing_time);
    for case in &summary.individual_results {
        let mark = |ok: bool| if ok { "ok" } else { "MISS" };
        let _ = writeln!(
            out,
            "  {:<16} severity {} ({} vs {})  category {} ({} vs {})",
            case.incident_id,
            mark(case.severity_match),
            case.predicted_severity,
            case.actual_severity,
            mark(case.category_match),
            case.predicted_category,
            case.actual_category
        );
    }
    out
}

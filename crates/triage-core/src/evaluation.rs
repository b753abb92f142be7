//! Golden-case evaluation
//!
//! Runs labelled incidents through the orchestrator and compares the
//! predictions with their ground truth.

use crate::error::TriageError;
use crate::orchestrator::Orchestrator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use triage_model::{Category, IncidentAlert, IncidentContext, Severity, ValidationError};

/// Expected outcome of a golden case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    /// Expected severity
    pub severity: Severity,
    /// Expected category
    pub category: Category,
    /// Expected root causes
    #[serde(default)]
    pub root_causes: Vec<String>,
}

/// Labelled incident
///
/// The alert is split between top-level identity fields and `alert_data`;
/// both are merged into one alert, with `alert_data` winning on conflicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenCase {
    /// Incident identifier
    pub incident_id: String,
    /// Alert timestamp
    pub timestamp: String,
    /// Alert name
    pub alert_name: String,
    /// Remaining alert fields
    #[serde(default)]
    pub alert_data: Map<String, Value>,
    /// Raw logs
    #[serde(default)]
    pub logs: Option<String>,
    /// Expected outcome
    pub ground_truth: GroundTruth,
}

impl GoldenCase {
    /// Incident context for this case
    ///
    /// # Errors
    /// The merged alert does not match the alert schema or fails
    /// validation.
    pub fn context(&self) -> Result<IncidentContext, ValidationError> {
        let mut fields = Map::new();
        fields.insert("incident_id".into(), Value::String(self.incident_id.clone()));
        fields.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        fields.insert("alert_name".into(), Value::String(self.alert_name.clone()));
        fields.extend(self.alert_data.clone());

        let alert: IncidentAlert = serde_json::from_value(Value::Object(fields))?;
        let ctx = IncidentContext::new(alert)?;
        Ok(match &self.logs {
            Some(logs) => ctx.with_logs(logs.clone()),
            None => ctx,
        })
    }
}

/// Comparison for one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseEvaluation {
    /// Incident identifier
    pub incident_id: String,
    /// Predicted severity equals expected
    pub severity_match: bool,
    /// Predicted category equals expected
    pub category_match: bool,
    /// Pipeline seconds
    pub processing_time: f64,
    /// Predicted severity
    pub predicted_severity: Severity,
    /// Expected severity
    pub actual_severity: Severity,
    /// Predicted category
    pub predicted_category: Category,
    /// Expected category
    pub actual_category: Category,
    /// Share of predicted causes matching an expected one
    pub root_cause_overlap: f64,
}

/// Aggregate over all cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Cases evaluated
    pub total_cases: usize,
    /// Share of severity matches
    pub severity_accuracy: f64,
    /// Share of category matches
    pub category_accuracy: f64,
    /// Mean pipeline seconds
    pub avg_processing_time: f64,
    /// Mean root-cause overlap
    pub avg_root_cause_precision: f64,
    /// Per-case detail
    pub individual_results: Vec<CaseEvaluation>,
}

/// Share of `predicted` causes that contain, or are contained in, some
/// `actual` cause (case-insensitive); 0 when either list is empty
#[must_use]
pub fn root_cause_overlap(predicted: &[String], actual: &[String]) -> f64 {
    if predicted.is_empty() || actual.is_empty() {
        return 0.0;
    }
    let actual: Vec<String> = actual.iter().map(|a| a.to_lowercase()).collect();
    let matches = predicted
        .iter()
        .map(|p| p.to_lowercase())
        .filter(|p| actual.iter().any(|a| p.contains(a.as_str()) || a.contains(p.as_str())))
        .count();
    ratio(matches, predicted.len())
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64
}

/// Runs golden cases through an orchestrator
pub struct Evaluator {
    orchestrator: Arc<Orchestrator>,
    golden_cases_dir: PathBuf,
}

impl Evaluator {
    /// Evaluator reading `*.json` cases from `golden_cases_dir`
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, golden_cases_dir: impl Into<PathBuf>) -> Self {
        Self {
            orchestrator,
            golden_cases_dir: golden_cases_dir.into(),
        }
    }

    /// Load every parseable case, sorted by file name
    ///
    /// A missing directory yields no cases; unreadable or invalid files are
    /// logged and skipped.
    pub async fn load_cases(&self) -> Vec<GoldenCase> {
        let dir = &self.golden_cases_dir;
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "golden cases directory not found");
                return Vec::new();
            }
        };

        let mut paths = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        paths.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "golden cases listing failed");
                    break;
                }
            }
        }
        paths.sort();

        let mut cases = Vec::with_capacity(paths.len());
        for path in paths {
            match read_case(&path).await {
                Ok(case) => cases.push(case),
                Err(e) => tracing::error!(path = %path.display(), error = %e, "skipping golden case"),
            }
        }
        tracing::info!(count = cases.len(), "golden cases loaded");
        cases
    }

    /// Evaluate every case in the directory; `None` when there are none
    ///
    /// # Errors
    /// Pipeline faults other than an invalid case.
    pub async fn evaluate_all(&self) -> Result<Option<EvaluationSummary>, TriageError> {
        let cases = self.load_cases().await;
        self.evaluate_cases(&cases).await
    }

    /// Evaluate the given cases; `None` when none could be run
    ///
    /// Cases whose alert fails validation are logged and skipped.
    ///
    /// # Errors
    /// Pipeline faults other than an invalid case.
    pub async fn evaluate_cases(&self, cases: &[GoldenCase]) -> Result<Option<EvaluationSummary>, TriageError> {
        let mut results = Vec::with_capacity(cases.len());

        for case in cases {
            tracing::info!(incident_id = %case.incident_id, "evaluating case");
            let ctx = match case.context() {
                Ok(ctx) => ctx,
                Err(e) => {
                    tracing::error!(incident_id = %case.incident_id, error = %e, "invalid golden case");
                    continue;
                }
            };
            let predicted = self.orchestrator.triage(&ctx).await?;
            let truth = &case.ground_truth;
            results.push(CaseEvaluation {
                incident_id: case.incident_id.clone(),
                severity_match: predicted.severity == truth.severity,
                category_match: predicted.category == truth.category,
                processing_time: predicted.processing_secs(),
                predicted_severity: predicted.severity,
                actual_severity: truth.severity,
                predicted_category: predicted.category,
                actual_category: truth.category,
                root_cause_overlap: root_cause_overlap(&predicted.root_causes, &truth.root_causes),
            });
        }

        if results.is_empty() {
            return Ok(None);
        }

        let n = results.len();
        let severity_accuracy = ratio(results.iter().filter(|r| r.severity_match).count(), n);
        let category_accuracy = ratio(results.iter().filter(|r| r.category_match).count(), n);
        #[allow(clippy::cast_precision_loss)]
        let avg_processing_time = results.iter().map(|r| r.processing_time).sum::<f64>() / n as f64;
        #[allow(clippy::cast_precision_loss)]
        let avg_root_cause_precision = results.iter().map(|r| r.root_cause_overlap).sum::<f64>() / n as f64;
        let summary = EvaluationSummary {
            total_cases: n,
            severity_accuracy,
            category_accuracy,
            avg_processing_time,
            avg_root_cause_precision,
            individual_results: results,
        };

        tracing::info!(
            cases = summary.total_cases,
            severity_accuracy = summary.severity_accuracy,
            category_accuracy = summary.category_accuracy,
            "evaluation complete"
        );
        Ok(Some(summary))
    }

    /// Evaluate all cases and write the summary as pretty JSON to `path`
    ///
    /// Nothing is written when there are no cases.
    ///
    /// # Errors
    /// Evaluation faults or a write failure.
    pub async fn generate_report(&self, path: impl AsRef<Path>) -> Result<Option<EvaluationSummary>, TriageError> {
        let path = path.as_ref();
        let Some(summary) = self.evaluate_all().await? else {
            tracing::warn!("no golden cases found, report not written");
            return Ok(None);
        };

        let body = serde_json::to_vec_pretty(&summary)
            .map_err(|e| TriageError::io_error(path, std::io::Error::other(e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TriageError::io_error(parent, e))?;
        }
        tokio::fs::write(path, body)
            .await
            .map_err(|e| TriageError::io_error(path, e))?;
        tracing::info!(path = %path.display(), "evaluation report saved");
        Ok(Some(summary))
    }
}

async fn read_case(path: &Path) -> Result<GoldenCase, String> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| (*x).to_string()).collect()
    }

    #[test]
    fn overlap_counts_containment_both_ways() {
        let predicted = s(&["Redis connection pool exhausted", "DNS failure", "memory"]);
        let actual = s(&["redis connection pool", "Memory leak in auth"]);
        // first contains an actual, third is contained in one
        let overlap = root_cause_overlap(&predicted, &actual);
        assert!((overlap - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn overlap_is_zero_for_empty_lists() {
        assert_eq!(root_cause_overlap(&[], &s(&["x"])), 0.0);
        assert_eq!(root_cause_overlap(&s(&["x"]), &[]), 0.0);
    }

    #[test]
    fn golden_case_merges_alert_data() {
        let case: GoldenCase = serde_json::from_str(
            r#"{
                "incident_id": "GC-1",
                "timestamp": "2024-01-15T10:30:00Z",
                "alert_name": "Auth down",
                "alert_data": {
                    "source": "prometheus",
                    "description": "auth refusing connections",
                    "metrics": {"failed_requests_per_min": 1310},
                    "affected_services": ["auth-service"]
                },
                "logs": "Connection refused",
                "ground_truth": {"severity": "SEV1", "category": "API/Service", "root_causes": ["redis down"]}
            }"#,
        )
        .unwrap();
        let ctx = case.context().unwrap();
        assert_eq!(ctx.alert.incident_id, "GC-1");
        assert_eq!(ctx.alert.source, "prometheus");
        assert_eq!(ctx.alert.metrics["failed_requests_per_min"], 1310.0);
        assert_eq!(ctx.alert.environment, "production");
        assert_eq!(ctx.logs.as_deref(), Some("Connection refused"));
        assert_eq!(case.ground_truth.severity, Severity::Sev1);
    }

    #[test]
    fn golden_case_without_source_is_rejected() {
        let case: GoldenCase = serde_json::from_str(
            r#"{"incident_id": "GC-2", "timestamp": "t", "alert_name": "x",
                "alert_data": {"description": "d"},
                "ground_truth": {"severity": "SEV3", "category": "Network"}}"#,
        )
        .unwrap();
        assert!(case.context().is_err());
    }
}

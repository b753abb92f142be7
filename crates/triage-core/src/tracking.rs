//! Metrics and feedback collaborators
//!
//! The orchestrator hands every finished result to a [`MetricsSink`]. The
//! sink is fire-and-forget: its errors are logged by the caller and never
//! fail a triage.

use crate::error::MetricsError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use triage_model::{Category, Severity, TriageResult};

/// Receiver of finished triage results
#[cfg_attr(test, mockall::automock)]
pub trait MetricsSink: Send + Sync {
    /// Record one result
    ///
    /// # Errors
    /// Implementation-specific bookkeeping failure.
    fn record_triage(&self, result: &TriageResult) -> Result<(), MetricsError>;
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_triage(&self, _result: &TriageResult) -> Result<(), MetricsError> {
        Ok(())
    }
}

/// One recorded triage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRecord {
    /// Incident identifier
    pub incident_id: String,
    /// When it was recorded
    pub timestamp: DateTime<Utc>,
    /// Predicted severity
    pub severity_predicted: Severity,
    /// Predicted category
    pub category_predicted: Category,
    /// Predicted root causes
    pub root_causes: Vec<String>,
    /// Rendered plan
    pub mitigation_plan: String,
    /// Plan citations
    pub citations: Vec<String>,
    /// Pipeline seconds
    pub processing_time: f64,
}

impl From<&TriageResult> for TriageRecord {
    fn from(result: &TriageResult) -> Self {
        Self {
            incident_id: result.incident_id.clone(),
            timestamp: Utc::now(),
            severity_predicted: result.severity,
            category_predicted: result.category,
            root_causes: result.root_causes.clone(),
            mitigation_plan: result.mitigation_plan.clone(),
            citations: result.citations.clone(),
            processing_time: result.processing_secs(),
        }
    }
}

/// Aggregate view of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Results recorded
    pub total_triages: usize,
    /// Mean processing seconds
    pub avg_processing_time: f64,
    /// When the session began
    pub session_start: DateTime<Utc>,
}

/// In-memory record of every triage in this process
#[derive(Debug)]
pub struct SessionMetrics {
    started: DateTime<Utc>,
    records: Mutex<Vec<TriageRecord>>,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMetrics {
    /// Start a session now
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Utc::now(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of recorded triages
    #[must_use]
    pub fn records(&self) -> Vec<TriageRecord> {
        self.records.lock().clone()
    }

    /// Session summary, `None` before the first triage
    #[must_use]
    pub fn summary(&self) -> Option<SessionSummary> {
        let records = self.records.lock();
        if records.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let avg = records.iter().map(|r| r.processing_time).sum::<f64>() / records.len() as f64;
        Some(SessionSummary {
            total_triages: records.len(),
            avg_processing_time: avg,
            session_start: self.started,
        })
    }
}

impl MetricsSink for SessionMetrics {
    fn record_triage(&self, result: &TriageResult) -> Result<(), MetricsError> {
        self.records.lock().push(TriageRecord::from(result));
        tracing::debug!(incident_id = %result.incident_id, "triage recorded");
        Ok(())
    }
}

/// Operator feedback on one triage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Incident identifier
    pub incident_id: String,
    /// When feedback was given
    pub timestamp: DateTime<Utc>,
    /// Severity the incident turned out to be
    pub severity_actual: Severity,
    /// Category the incident turned out to be
    pub category_actual: Category,
    /// How accurate the root causes were, in [0, 1]
    pub root_cause_accuracy: f64,
    /// Whether the plan helped
    pub mitigation_helpful: bool,
    /// Free text
    #[serde(default)]
    pub notes: String,
}

impl FeedbackRecord {
    /// Create record stamped now; accuracy is clamped to [0, 1]
    #[must_use]
    pub fn new(
        incident_id: impl Into<String>,
        severity_actual: Severity,
        category_actual: Category,
        root_cause_accuracy: f64,
        mitigation_helpful: bool,
    ) -> Self {
        Self {
            incident_id: incident_id.into(),
            timestamp: Utc::now(),
            severity_actual,
            category_actual,
            root_cause_accuracy: triage_model::clamp_unit(root_cause_accuracy),
            mitigation_helpful,
            notes: String::new(),
        }
    }

    /// Attach notes
    #[inline]
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Append-only JSON-lines feedback file
#[derive(Debug, Clone)]
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    /// Log at `path`; the file is created on first append
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a line
    ///
    /// # Errors
    /// File creation or write failure.
    pub async fn append(&self, record: &FeedbackRecord) -> Result<(), MetricsError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        tracing::info!(incident_id = %record.incident_id, path = %self.path.display(), "feedback recorded");
        Ok(())
    }

    /// Every record in the log; a missing file yields none
    ///
    /// # Errors
    /// Read failure or an undecodable line.
    pub async fn read_all(&self) -> Result<Vec<FeedbackRecord>, MetricsError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(MetricsError::from))
            .collect()
    }

    fn io_error(&self, source: std::io::Error) -> MetricsError {
        MetricsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(id: &str, secs: u64) -> TriageResult {
        TriageResult {
            incident_id: id.into(),
            severity: Severity::Sev2,
            category: Category::Database,
            confidence: 0.8,
            root_causes: vec!["pool exhausted".into()],
            mitigation_plan: String::new(),
            relevant_documents: vec![],
            citations: vec![],
            reasoning: String::new(),
            processing_time: Duration::from_secs(secs),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_averages_processing_time() {
        let session = SessionMetrics::new();
        assert!(session.summary().is_none());
        session.record_triage(&result("INC-1", 2)).unwrap();
        session.record_triage(&result("INC-2", 4)).unwrap();
        let summary = session.summary().unwrap();
        assert_eq!(summary.total_triages, 2);
        assert_eq!(summary.avg_processing_time, 3.0);
        assert_eq!(session.records()[1].incident_id, "INC-2");
    }

    #[test]
    fn mock_sink_sees_each_result() {
        let mut sink = MockMetricsSink::new();
        sink.expect_record_triage()
            .withf(|r| r.incident_id == "INC-3")
            .times(1)
            .returning(|_| Ok(()));
        sink.record_triage(&result("INC-3", 1)).unwrap();
    }

    #[tokio::test]
    async fn feedback_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("nested/feedback.jsonl"));
        assert!(log.read_all().await.unwrap().is_empty());

        log.append(&FeedbackRecord::new("INC-1", Severity::Sev1, Category::ApiService, 0.9, true))
            .await
            .unwrap();
        log.append(
            &FeedbackRecord::new("INC-2", Severity::Sev3, Category::Database, 1.7, false)
                .with_notes("wrong pool"),
        )
        .await
        .unwrap();

        let records = log.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].root_cause_accuracy, 1.0);
        assert_eq!(records[1].notes, "wrong pool");

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.contains("\"severity_actual\":\"SEV1\""));
    }
}

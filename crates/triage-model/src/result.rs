//! Terminal triage record

use crate::classification::{Category, Severity};
use crate::document::GroundingReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregated output of one orchestration run
///
/// Immutable once built; the orchestrator creates exactly one per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    /// Incident identifier copied from the alert
    pub incident_id: String,
    /// Final severity
    pub severity: Severity,
    /// Final category
    pub category: Category,
    /// Classification confidence in [0, 1]
    pub confidence: f64,
    /// Root-cause descriptions in rank order
    pub root_causes: Vec<String>,
    /// Rendered mitigation plan (markdown)
    pub mitigation_plan: String,
    /// Grounding documents used by the analysis
    pub relevant_documents: Vec<GroundingReference>,
    /// Merged citations
    pub citations: Vec<String>,
    /// Classification reasoning
    pub reasoning: String,
    /// Wall-clock time spent in the pipeline
    #[serde(rename = "processing_time_seconds", with = "duration_secs")]
    pub processing_time: Duration,
    /// When the record was produced
    pub created_at: DateTime<Utc>,
}

impl TriageResult {
    /// Processing time in fractional seconds
    #[inline]
    #[must_use]
    pub fn processing_secs(&self) -> f64 {
        self.processing_time.as_secs_f64()
    }

    /// Whether any playbook grounded the result
    #[inline]
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        !self.relevant_documents.is_empty()
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

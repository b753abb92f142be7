//! The three reasoning stages
//!
//! Each stage makes one generation call and interprets the response. A
//! response that does not fit the expected structure is replaced by the
//! stage's fallback value; transport and retrieval failures propagate.

pub mod classification;
pub mod mitigation;
pub mod root_cause;

pub use classification::ClassificationStage;
pub use mitigation::MitigationStage;
pub use root_cause::RootCauseStage;

use crate::structured::MalformedOutput;

/// Log and count a stage falling back to its default output
pub(crate) fn note_fallback(stage: &'static str, err: &MalformedOutput, response: &str) {
    tracing::warn!(stage, error = %err, response_chars = response.len(), "generated output unusable, using fallback");
    tracing::debug!(stage, response, "unusable response");
    ::metrics::counter!("triage_stage_fallbacks_total", "stage" => stage).increment(1);
}

/// Text of an optional string field, `None` when blank
pub(crate) fn non_blank(value: Option<&serde_json::Value>) -> Option<String> {
    value
        .and_then(crate::structured::label_text)
        .filter(|s| !s.is_empty())
}

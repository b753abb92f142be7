//! Severity and category classification

use super::{non_blank, note_fallback};
use crate::config::PipelineConfig;
use crate::error::TriageError;
use crate::escalation::SeverityPolicy;
use crate::prompts;
use crate::structured::{extract_json_object, score_value, MalformedOutput};
use std::sync::Arc;
use triage_llm::{GenerationClient, GenerationRequest};
use triage_model::{Category, Classification, IncidentContext, Severity};

/// Confidence assigned when the model omits one
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Confidence of the parse-failure fallback
const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Maps an incident to a severity level and category
pub struct ClassificationStage {
    generator: Arc<dyn GenerationClient>,
    policy: SeverityPolicy,
    config: PipelineConfig,
}

impl ClassificationStage {
    /// Create stage with the default severity policy
    #[must_use]
    pub fn new(generator: Arc<dyn GenerationClient>, config: PipelineConfig) -> Self {
        Self {
            generator,
            policy: SeverityPolicy::default(),
            config,
        }
    }

    /// Replace the severity policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: SeverityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Classify one incident
    ///
    /// Out-of-set labels are coerced and unparseable output becomes a
    /// low-confidence SEV3/Infrastructure result. Either way the severity
    /// floor is applied last.
    ///
    /// # Errors
    /// Generation transport failures.
    pub async fn classify(&self, ctx: &IncidentContext) -> Result<Classification, TriageError> {
        let mut request = GenerationRequest::new(prompts::classification_prompt(
            ctx,
            self.config.classification_log_chars,
        ))
        .with_system_prompt(prompts::CLASSIFICATION_SYSTEM_PROMPT)
        .with_temperature(self.config.classification_temperature);
        if let Some(max) = self.config.classification_max_tokens {
            request = request.with_max_tokens(max);
        }

        let response = self.generator.generate(&request).await?;
        let mut classification = interpret(&response).unwrap_or_else(|err| {
            note_fallback("classification", &err, &response);
            fallback()
        });

        self.policy.enforce(ctx, &mut classification);

        tracing::info!(
            severity = %classification.severity,
            category = %classification.category,
            confidence = classification.confidence,
            "classified"
        );
        Ok(classification)
    }
}

/// Result used when the response cannot be parsed at all
#[must_use]
pub fn fallback() -> Classification {
    let mut out = Classification::new(
        Severity::default(),
        Category::DEFAULT_CLASSIFICATION,
        FALLBACK_CONFIDENCE,
        "Classification failed, using default values",
    );
    out.warn("generated classification could not be parsed");
    out
}

/// Parse and validate a classification response
///
/// # Errors
/// `MalformedOutput` when the response holds no JSON object.
pub fn interpret(response: &str) -> Result<Classification, MalformedOutput> {
    let map = extract_json_object(response)?;
    let mut warnings = Vec::new();

    let raw_severity = non_blank(map.get("severity"));
    let severity = match raw_severity.as_deref().map(str::parse::<Severity>) {
        Some(Ok(sev)) => sev,
        _ => {
            let fallback = Severity::default();
            tracing::warn!(value = ?raw_severity, %fallback, "invalid severity");
            warnings.push(format!(
                "severity {} outside SEV1..SEV4, defaulted to {fallback}",
                raw_severity.as_deref().unwrap_or("<missing>")
            ));
            fallback
        }
    };

    let raw_category = non_blank(map.get("category"));
    let category = match raw_category.as_deref().map(str::parse::<Category>) {
        Some(Ok(cat)) if cat.is_classifiable() => cat,
        _ => {
            let fallback = Category::DEFAULT_CLASSIFICATION;
            tracing::warn!(value = ?raw_category, %fallback, "invalid category");
            warnings.push(format!(
                "category {} outside the category set, defaulted to {fallback}",
                raw_category.as_deref().unwrap_or("<missing>")
            ));
            fallback
        }
    };

    let confidence = match map.get("confidence").and_then(score_value) {
        Some(c) => c,
        None => {
            warnings.push(format!("confidence missing, assumed {DEFAULT_CONFIDENCE}"));
            DEFAULT_CONFIDENCE
        }
    };

    let reasoning = non_blank(map.get("reasoning")).unwrap_or_default();
    let mut out = Classification::new(severity, category, confidence, reasoning);
    for w in warnings {
        out.warn(w);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_response_is_taken_as_is() {
        let c = interpret(
            r#"{"severity": "SEV2", "category": "Database", "confidence": 0.85, "reasoning": "pool at 95/100"}"#,
        )
        .unwrap();
        assert_eq!(c.severity, Severity::Sev2);
        assert_eq!(c.category, Category::Database);
        assert_eq!(c.confidence, 0.85);
        assert_eq!(c.reasoning, "pool at 95/100");
        assert!(c.warnings.is_empty());
    }

    #[test]
    fn out_of_set_labels_are_coerced_with_warnings() {
        let c = interpret(r#"{"severity": "P0", "category": "Kubernetes", "confidence": 0.9}"#).unwrap();
        assert_eq!(c.severity, Severity::Sev3);
        assert_eq!(c.category, Category::Infrastructure);
        assert_eq!(c.warnings.len(), 2);
    }

    #[test]
    fn general_is_not_a_classification() {
        let c = interpret(r#"{"severity": "SEV4", "category": "General", "confidence": 1}"#).unwrap();
        assert_eq!(c.category, Category::Infrastructure);
    }

    #[test]
    fn confidence_is_clamped_or_defaulted() {
        let high = interpret(r#"{"severity": "SEV1", "category": "Network", "confidence": 7}"#).unwrap();
        assert_eq!(high.confidence, 1.0);
        let missing = interpret(r#"{"severity": "SEV1", "category": "Network"}"#).unwrap();
        assert_eq!(missing.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn fenced_lowercase_labels_parse() {
        let c = interpret("```json\n{\"severity\": \"sev1\", \"category\": \"api/service\", \"confidence\": \"0.9\"}\n```")
            .unwrap();
        assert_eq!(c.severity, Severity::Sev1);
        assert_eq!(c.category, Category::ApiService);
    }

    #[test]
    fn prose_only_is_malformed() {
        assert!(interpret("This looks like a SEV1 to me.").is_err());
        let f = fallback();
        assert_eq!(f.severity, Severity::Sev3);
        assert_eq!(f.category, Category::Infrastructure);
        assert_eq!(f.confidence, 0.3);
    }
}

//! Incident alerts and the context wrapped around them
//!
//! [`IncidentAlert`] mirrors the payload emitted by monitoring sources.
//! [`IncidentContext`] adds optional raw logs and operator notes and is the
//! single input threaded through every triage stage.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_environment() -> String {
    "production".to_string()
}

/// Structured alert as received from a monitoring source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentAlert {
    /// Natural key for downstream correlation
    pub incident_id: String,
    /// Source-formatted timestamp
    pub timestamp: String,
    /// Emitting system (e.g. "prometheus", "datadog")
    pub source: String,
    /// Alert rule name
    pub alert_name: String,
    /// Free-text description
    pub description: String,
    /// Metric name to value
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Names of the services involved
    #[serde(default)]
    pub affected_services: Vec<String>,
    /// Environment tag
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl IncidentAlert {
    /// Create alert with required fields; the rest start empty
    #[must_use]
    pub fn new(
        incident_id: impl Into<String>,
        timestamp: impl Into<String>,
        source: impl Into<String>,
        alert_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            incident_id: incident_id.into(),
            timestamp: timestamp.into(),
            source: source.into(),
            alert_name: alert_name.into(),
            description: description.into(),
            metrics: BTreeMap::new(),
            affected_services: Vec::new(),
            environment: default_environment(),
            tags: Vec::new(),
        }
    }

    /// Add a metric
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Add an affected service
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.affected_services.push(service.into());
        self
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set environment
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Parse and validate a JSON alert payload
    ///
    /// # Errors
    /// `ValidationError::MalformedPayload` when the JSON does not match the
    /// schema, or any error from [`IncidentAlert::validate`].
    pub fn from_json(payload: &str) -> Result<Self, ValidationError> {
        let alert: Self = serde_json::from_str(payload)?;
        alert.validate()?;
        Ok(alert)
    }

    /// Check required fields and metric values
    ///
    /// # Errors
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("incident_id", &self.incident_id),
            ("timestamp", &self.timestamp),
            ("source", &self.source),
            ("alert_name", &self.alert_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField { field });
            }
        }

        if let Some((name, _)) = self.metrics.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValidationError::NonFiniteMetric { name: name.clone() });
        }

        if let Some(index) = self
            .affected_services
            .iter()
            .position(|s| s.trim().is_empty())
        {
            return Err(ValidationError::EmptyServiceName { index });
        }

        Ok(())
    }
}

/// Alert plus optional logs and operator context
///
/// Built once per triage and passed by reference through every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentContext {
    /// The alert being triaged
    pub alert: IncidentAlert,
    /// Raw log text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    /// Free-text context supplied by the operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl IncidentContext {
    /// Wrap a validated alert
    ///
    /// # Errors
    /// Any error from [`IncidentAlert::validate`].
    pub fn new(alert: IncidentAlert) -> Result<Self, ValidationError> {
        alert.validate()?;
        Ok(Self {
            alert,
            logs: None,
            additional_context: None,
        })
    }

    /// Attach raw logs; blank text is treated as absent
    #[must_use]
    pub fn with_logs(mut self, logs: impl Into<String>) -> Self {
        self.logs = non_blank(logs.into());
        self
    }

    /// Attach operator context; blank text is treated as absent
    #[must_use]
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = non_blank(context.into());
        self
    }

    /// Incident identifier
    #[inline]
    #[must_use]
    pub fn incident_id(&self) -> &str {
        &self.alert.incident_id
    }

    /// Re-check the wrapped alert
    ///
    /// # Errors
    /// Any error from [`IncidentAlert::validate`].
    #[inline]
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.alert.validate()
    }

    /// First `max_chars` characters of the logs, if any
    #[must_use]
    pub fn log_prefix(&self, max_chars: usize) -> Option<&str> {
        self.logs.as_deref().map(|logs| truncate_chars(logs, max_chars))
    }
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

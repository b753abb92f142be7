//! Error types for caller-supplied incident payloads
//!
//! Validation runs before any pipeline stage; a payload that fails here never
//! reaches classification.

/// Invalid caller input
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Payload is not valid JSON or does not match the alert schema
    #[error("malformed incident payload: {0}")]
    MalformedPayload(String),

    /// A required text field is empty or whitespace
    #[error("required field '{field}' is empty")]
    EmptyField {
        /// Field name as it appears in the payload
        field: &'static str,
    },

    /// A metric value is NaN or infinite
    #[error("metric '{name}' is not a finite number")]
    NonFiniteMetric {
        /// Metric name
        name: String,
    },

    /// An affected-service entry is blank
    #[error("affected service at position {index} is empty")]
    EmptyServiceName {
        /// Position in the affected services list
        index: usize,
    },
}

impl ValidationError {
    /// Field or metric the error refers to, when there is one
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::EmptyField { field } => Some(field),
            Self::NonFiniteMetric { name } => Some(name),
            Self::MalformedPayload(_) | Self::EmptyServiceName { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedPayload(e.to_string())
    }
}

//! Error types for generation backends

/// Generation backend failure
///
/// The client never interprets response text; a structurally wrong answer
/// from the model is not an error at this layer.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Backend cannot be reached or the model is not served
    #[error("generation backend '{backend}' unavailable: {reason}")]
    Unavailable {
        /// Backend name
        backend: String,
        /// Underlying cause
        reason: String,
    },

    /// API key environment variable is unset or empty
    #[error("API key not found; set the {env_var} environment variable")]
    MissingApiKey {
        /// Variable that was read
        env_var: String,
    },

    /// Backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// Response envelope did not match the backend's schema
    #[error("invalid response envelope: {0}")]
    InvalidResponse(String),

    /// Transport failure after the connection was established
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GenerationError {
    /// Build the variant matching a transport error
    pub(crate) fn from_transport(backend: &str, e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::Unavailable {
                backend: backend.to_string(),
                reason: e.to_string(),
            }
        } else {
            Self::Http(e)
        }
    }

    /// Whether the backend itself could not be reached
    #[inline]
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::MissingApiKey { .. })
    }
}

//! Error types for model provider implementations.

use taskgraph_core::llm::ModelError;
use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when talking to a model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport failure (includes request timeouts).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Provider rate limit hit.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// Provider returned a non-success status.
    #[error("provider error {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Provider response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Structured completion returned null, a refusal, or invalid JSON.
    #[error("structured output missing: {0}")]
    NullParse(String),

    /// Required configuration was missing or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Classify a non-success HTTP status into the matching error kind.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Authentication(body),
            429 => Self::RateLimited(body),
            _ => Self::Status { status, body },
        }
    }
}

impl From<LlmError> for ModelError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NullParse(msg) => ModelError::Parse(msg),
            other => ModelError::Call(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            LlmError::from_status(401, String::new()),
            LlmError::Authentication(_)
        ));
        assert!(matches!(
            LlmError::from_status(429, String::new()),
            LlmError::RateLimited(_)
        ));
        assert!(matches!(
            LlmError::from_status(500, String::new()),
            LlmError::Status { status: 500, .. }
        ));
    }

    #[test]
    fn test_null_parse_maps_to_parse_error() {
        let model_err: ModelError = LlmError::NullParse("refused".to_string()).into();
        assert!(matches!(model_err, ModelError::Parse(_)));

        let model_err: ModelError = LlmError::Config("missing key".to_string()).into();
        assert!(matches!(model_err, ModelError::Call(_)));
    }
}

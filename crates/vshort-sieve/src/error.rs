//! Sieve backend error types.

use thiserror::Error;

/// Result type for Sieve backend operations.
pub type SieveResult<T> = Result<T, SieveError>;

/// Errors that can occur while talking to the Sieve backend.
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Sieve API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SieveError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of a rejected request, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SieveError::ApiError { status, .. } => Some(*status),
            SieveError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if error is retryable.
    ///
    /// Network failures, rate limits and server errors are transient; other
    /// API rejections are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            SieveError::Network(_) => true,
            SieveError::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SieveError::api(503, "unavailable").is_retryable());
        assert!(SieveError::api(429, "slow down").is_retryable());
        assert!(!SieveError::api(401, "bad key").is_retryable());
        assert!(!SieveError::invalid_request("empty source id").is_retryable());
    }

    #[test]
    fn test_api_error_message() {
        let err = SieveError::api(400, "invalid url");
        assert_eq!(err.to_string(), "Sieve API error (400): invalid url");
        assert_eq!(err.status(), Some(400));
    }
}

//! Integration client error types and failure classification.

use thiserror::Error;

/// How the retry policy should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Worth retrying with backoff (network trouble, server-side rate
    /// rejection, 5xx).
    Transient,
    /// Non-retryable and fatal for the whole run (credential rejected).
    Fatal,
    /// Non-retryable but scoped to this one operation (malformed response,
    /// permanent API refusal); the run continues.
    PerOperation,
}

/// Errors raised by the CRM integration client.
#[derive(Debug, Error)]
pub enum CrmError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The CRM rejected the credential.
    #[error("authorization rejected: {0}")]
    Auth(String),

    /// Server-side request budget exhausted (HTTP 429 or the CRM's own
    /// limit-exceeded error code).
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Transient server failure (5xx).
    #[error("server error (HTTP {status})")]
    Server { status: u16 },

    /// The CRM returned an application-level error envelope.
    #[error("API error ({code}): {description}")]
    Api { code: String, description: String },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CrmError {
    /// Classify this failure for the retry policy.
    #[must_use]
    pub fn classify(&self) -> ErrorClass {
        match self {
            Self::Http(e) => {
                if e.is_decode() {
                    ErrorClass::PerOperation
                } else {
                    // Timeouts, connection resets, DNS trouble.
                    ErrorClass::Transient
                }
            }
            Self::RateLimited { .. } | Self::Server { .. } => ErrorClass::Transient,
            Self::Auth(_) => ErrorClass::Fatal,
            Self::Api { .. } | Self::Malformed(_) => ErrorClass::PerOperation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_matches_taxonomy() {
        assert_eq!(
            CrmError::RateLimited { retry_after_secs: 1 }.classify(),
            ErrorClass::Transient
        );
        assert_eq!(CrmError::Server { status: 503 }.classify(), ErrorClass::Transient);
        assert_eq!(
            CrmError::Auth("expired_token".into()).classify(),
            ErrorClass::Fatal
        );
        assert_eq!(
            CrmError::Malformed("no result field".into()).classify(),
            ErrorClass::PerOperation
        );
        assert_eq!(
            CrmError::Api {
                code: "NOT_FOUND".into(),
                description: String::new()
            }
            .classify(),
            ErrorClass::PerOperation
        );
    }
}

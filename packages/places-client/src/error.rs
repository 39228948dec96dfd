//! Error types for the Places client.

use thiserror::Error;

/// Result type for Places client operations.
pub type Result<T> = std::result::Result<T, PlacesError>;

/// Places client errors.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// Quota or per-minute limit exhausted (HTTP 429)
    #[error("rate limited by Places API: {0}")]
    RateLimited(String),

    /// Transport failure (connection refused, DNS, timeout)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response other than 429
    #[error("Places API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Place id is not a plain token; the request was never sent
    #[error("invalid place id: {0:?}")]
    InvalidPlaceId(String),
}

impl PlacesError {
    /// Whether a retry of the same request may succeed.
    ///
    /// Server-side failures and transport errors are retryable. Rate limits are
    /// reported separately so callers can pause instead of hammering the quota.
    pub fn is_transient(&self) -> bool {
        match self {
            PlacesError::Network(_) => true,
            PlacesError::Api { status, .. } => *status >= 500,
            PlacesError::RateLimited(_) | PlacesError::Parse(_) | PlacesError::InvalidPlaceId(_) => false,
        }
    }
}

/// Classify a non-success HTTP status into a typed error.
pub(crate) fn error_for_status(status: u16, body: String) -> PlacesError {
    if status == 429 {
        PlacesError::RateLimited(body)
    } else {
        PlacesError::Api {
            status,
            message: body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_requests_is_rate_limited() {
        let err = error_for_status(429, "RESOURCE_EXHAUSTED".into());
        assert!(matches!(err, PlacesError::RateLimited(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(error_for_status(503, String::new()).is_transient());
        assert!(error_for_status(500, String::new()).is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = error_for_status(403, "API key not valid".into());
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "Places API error (403): API key not valid"
        );
    }
}

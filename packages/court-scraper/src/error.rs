//! Typed errors for the collection pipeline.
//!
//! External API failures are always caught at the unit boundary (one query or
//! one place). Only [`StorageError`] is allowed to halt a run.

use places_client::PlacesError;
use thiserror::Error;

/// Errors raised while working on a single unit (one query or one place).
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// External quota exhausted; the current phase stops.
    #[error("rate limited during {operation}")]
    RateLimited { operation: &'static str },

    /// Connectivity or server-side failure that survived the retry budget
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Payload could not be parsed into the expected record shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Non-retryable rejection (bad key, bad request)
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Durable store could not be written; fatal
    #[error("storage write failed: {0}")]
    StorageWrite(#[from] StorageError),
}

impl ScrapeError {
    /// Convert a client error, tagging rate limits with the operation that hit them.
    pub fn from_places(operation: &'static str, err: PlacesError) -> Self {
        match err {
            PlacesError::RateLimited(_) => ScrapeError::RateLimited { operation },
            PlacesError::Network(e) => ScrapeError::TransientNetwork(e.to_string()),
            PlacesError::Api { status, message } if status >= 500 => {
                ScrapeError::TransientNetwork(format!("HTTP {status}: {message}"))
            }
            PlacesError::Api { status, message } => ScrapeError::Rejected { status, message },
            PlacesError::Parse(msg) => ScrapeError::MalformedResponse(msg),
            PlacesError::InvalidPlaceId(id) => ScrapeError::Rejected {
                status: 400,
                message: format!("invalid place id {id:?}"),
            },
        }
    }

    /// Eligible for bounded retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScrapeError::TransientNetwork(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ScrapeError::RateLimited { .. })
    }

    /// Only storage failures end the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::StorageWrite(_))
    }
}

/// Errors from the durable key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Key would resolve outside the storage root
    #[error("invalid storage key {key:?}")]
    InvalidKey { key: String },

    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

//! Error types for the cache and the fetcher
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error ==
/// Failure reported by a backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The host refused the write because its own storage quota is exhausted
    #[error("Storage quota exceeded: {0}")]
    Quota(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// == Cache Error Enum ==
/// Internal cache failures.
///
/// None of these reach the caller of the cache: they are logged and turned
/// into a miss or a no-op.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Stored payload could not be deserialized
    #[error("Corrupt entry: {0}")]
    CorruptEntry(String),

    /// Value does not fit, even after eviction
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Backing store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Value could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key collides with the reserved metadata key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache internals.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Attempt Failure ==
/// Why a single fetch attempt did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// No response was received
    #[error("transport failure: {0}")]
    Transport(String),

    /// A response arrived with a non-success status
    #[error("HTTP {status} {reason}")]
    Status { status: u16, reason: String },
}

// == Fetch Error ==
/// Errors surfaced by the resilient fetcher.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The server rejected the request with a status that is never retried
    #[error("Request rejected: HTTP {status} {reason}")]
    Terminal { status: u16, reason: String },

    /// Every attempt failed with a retryable failure
    #[error("Retry budget exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: AttemptFailure },

    /// The request could not be built (bad URL, bad header)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The success body was not valid JSON for the requested type
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// HTTP status carried by the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Terminal { status, .. } => Some(*status),
            FetchError::Exhausted {
                last: AttemptFailure::Status { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetchError::Exhausted { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchError::Terminal { .. })
    }
}

//! Generation error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Only `generate`
//! returns these; the health and metadata operations degrade to values.

use thiserror::Error;

/// Errors that can occur during a single generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The backend did not answer within the generation timeout.
    #[error("request timed out after {duration_ms}ms - model might be too slow")]
    Timeout { duration_ms: u64 },

    /// Non-2xx HTTP response from the backend. `body` is kept verbatim.
    #[error("backend rejected request: HTTP {status} - {body}")]
    BackendRejected { status: u16, body: String },

    /// Connection, protocol or decoding failure other than a timeout.
    #[error("transport failure: {detail}")]
    TransportFailure { detail: String },
}

impl GenerationError {
    /// Map a `reqwest` error, keeping timeouts distinguishable from other
    /// transport failures.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout {
                duration_ms: timeout_ms,
            }
        } else {
            GenerationError::TransportFailure {
                detail: err.to_string(),
            }
        }
    }

    /// HTTP status of a rejected request, if this is a `BackendRejected`.
    pub fn status(&self) -> Option<u16> {
        match self {
            GenerationError::BackendRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend was merely slow rather than broken.
    pub fn is_timeout(&self) -> bool {
        matches!(self, GenerationError::Timeout { .. })
    }
}

//! Request-layer error types and conversions.

use svcplane_core::error::PlaneError;

/// Errors raised while building or sending a single broker request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("failed to build broker URL from {base:?}: {reason}")]
    Url { base: String, reason: String },

    #[error("failed to execute HTTP request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request returned non-OK status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<RequestError> for PlaneError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Status { status, body } => {
                PlaneError::BrokerRequestFailed { status, body }
            }
            RequestError::Url { .. } => PlaneError::Validation {
                message: err.to_string(),
            },
            RequestError::Transport(e) => PlaneError::Transport(e.to_string()),
        }
    }
}

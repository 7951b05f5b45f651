//! Transport-level failures of a single API call.

use thiserror::Error;

/// Outcome of an HTTP call that did not produce a usable body
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request cancelled")]
    Cancelled,

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No response received: {0}")]
    NoResponse(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status code, if a response was received at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ApiError::NoResponse(e.to_string())
        }
    }
}

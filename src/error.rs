use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the backend client and the flows built on it
#[derive(Error, Debug)]
pub enum ClientError {
    /// Request never produced a response (connect, timeout, TLS)
    #[error("Request to {path} failed: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Backend answered with a non-success status
    #[error("{path} returned {status}: {message}")]
    Status {
        path: String,
        status: StatusCode,
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("Failed to decode {path} response: {message}")]
    Decode { path: String, message: String },

    /// No token or user id available
    #[error("No active session: {0}")]
    NoSession(&'static str),

    /// Rejected client-side before any request was sent
    #[error("{0}")]
    Validation(String),

    /// Action requires the ADMIN role
    #[error("Admin role required")]
    Forbidden,
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    /// HTTP status when the backend answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

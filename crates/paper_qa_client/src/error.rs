//! Failure taxonomy for Resource Client calls.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never got a response (offline, DNS, connection refused).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The backend answered with a non-success status. Body is passed through untouched.
    #[error("server responded with {status}: {body}")]
    Server { status: StatusCode, body: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// HTTP status for server errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Conflicts are reported as 409 by some backends and as 400 with an
    /// "already exists" message by others.
    pub fn is_conflict(&self) -> bool {
        match self.status() {
            Some(StatusCode::CONFLICT) => true,
            Some(StatusCode::BAD_REQUEST) => self
                .server_message()
                .map(|m| m.to_ascii_lowercase().contains("already exists"))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// The backend's `{"error": "..."}` message, if the body carries one.
    pub fn server_message(&self) -> Option<String> {
        let ClientError::Server { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e)
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SessionError::Api { status, .. } => Some(*status),
            SessionError::Http(err) => err.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

//! Error types for azdo-tools.

use thiserror::Error;

/// Main error type for azdo operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failed (401)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Authenticated but not allowed (403)
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Requested entity does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// API returned an error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Tool arguments rejected before any remote call
    #[error("Validation error: {0}")]
    Validation(String),

    /// No domain claims the requested tool name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map an HTTP status code and response body to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Error::Auth(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }

    /// Whether this error means the remote entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for azdo operations.
pub type Result<T> = std::result::Result<T, Error>;

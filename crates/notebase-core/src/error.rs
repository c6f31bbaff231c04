//! Error types for notebase.

use thiserror::Error;

/// Result type alias using notebase's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notebase operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced instance does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Instance with the same name already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A unique index rejected the write
    #[error("Not unique: {0}")]
    NotUnique(String),

    /// Credential rejected or lacks the privilege for the query
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Database rejected the query for any other reason
    #[error("Query error: {0}")]
    Query(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Per-call deadline elapsed before the database answered
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for the "instance not found" class of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True when a create-if-not-exists step lost the race or found the instance.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists(_))
    }

    /// True when a unique index rejected a write.
    pub fn is_not_unique(&self) -> bool {
        matches!(self, Error::NotUnique(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}

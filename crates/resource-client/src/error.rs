//! Resource client errors

use thiserror::Error;

/// Errors that can occur when talking to the API server
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or server-side unavailability; retry with the same cursor
    #[error("API unavailable: {0}")]
    Unavailable(String),

    /// The watch cursor is too old; a fresh list is required
    #[error("Watch cursor expired: {0}")]
    CursorExpired(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists (create raced with another writer)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// API server rejected the request
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code reported by the server
        code: u16,
        /// Server-provided message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Classify an API status code into the client error taxonomy.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            404 => Self::NotFound(message),
            409 => Self::AlreadyExists(message),
            410 => Self::CursorExpired(message),
            429 | 500..=599 => Self::Unavailable(message),
            _ => Self::Api { code, message },
        }
    }

    /// Whether retrying the same request (same cursor) may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Whether the error requires discarding the watch cursor.
    pub fn is_cursor_expired(&self) -> bool {
        matches!(self, Self::CursorExpired(_))
    }

    /// Whether the error is a plain "does not exist" answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the error reports a create/create race.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

impl From<kube::Error> for ClientError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(status) => Self::from_status(status.code, status.message.clone()),
            kube::Error::SerdeError(err) => Self::Serialization(err),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

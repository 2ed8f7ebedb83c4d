//! Error types for session operations.

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Session and transport error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The authorization code exchange was rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The backend answered 401, or an authenticated call was attempted
    /// without a live session. The session has already been torn down.
    #[error("Unauthorized")]
    Unauthorized,

    /// Non-success status from the backend.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Backend-provided message, or the status reason.
        message: String,
    },

    /// Token store failure.
    #[error("Token storage error: {0}")]
    Storage(String),

    /// Keyring access failed.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Creates an API error from a status code and message.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this error ended the session.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

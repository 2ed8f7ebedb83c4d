//! Session token types.

use crate::error::Error;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime of a persisted access token.
pub const ACCESS_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Lifetime of a persisted refresh token.
pub const REFRESH_TOKEN_LIFETIME_DAYS: i64 = 30;

/// Bearer token of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Access token sent as `Authorization: Bearer`.
    pub access_token: String,
    /// Refresh token. Stored for later use; nothing exchanges it yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the persisted access token stops being restorable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Creates a token without refresh token or expiry.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Creates a token from the auth callback response, stamping a
    /// 24 hour expiry.
    #[must_use]
    pub fn from_response(response: TokenResponse) -> Self {
        Self {
            access_token: response.token,
            refresh_token: response.refresh_token,
            expires_at: Some(Utc::now() + Duration::hours(ACCESS_TOKEN_LIFETIME_HOURS)),
        }
    }

    /// Value of the `Authorization` header for this token.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Successful body of `POST /api/auth/callback`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    #[serde(alias = "access_token")]
    pub token: String,
    /// Refresh token, when the backend issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Error body returned by the backend.
///
/// Auth endpoints report `detail`, the search proxy reports `description`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    /// Error detail.
    #[serde(default)]
    pub detail: Option<String>,
    /// Error description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorResponse {
    /// Parses an error body, tolerating non-JSON payloads.
    #[must_use]
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Returns the most specific message available.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.detail.as_deref().or(self.description.as_deref())
    }

    /// Converts to an authentication failure.
    #[must_use]
    pub fn into_auth_error(self) -> Error {
        let message = self
            .message()
            .map_or_else(|| "authorization rejected".to_string(), str::to_string);
        Error::AuthenticationFailed(message)
    }
}

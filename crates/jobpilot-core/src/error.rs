//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Session or transport failure, including `Unauthorized`.
    #[error(transparent)]
    Session(#[from] jobpilot_session::Error),

    /// Search could not run; the current result set is unchanged.
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// Detail fetch for one vacancy failed.
    #[error("Enrichment failed for vacancy {id}: {reason}")]
    EnrichmentFailed {
        /// Vacancy identifier.
        id: String,
        /// Failure reason.
        reason: String,
    },

    /// Application for one vacancy failed.
    #[error("Submission failed for vacancy {id}: {reason}")]
    SubmissionFailed {
        /// Vacancy identifier.
        id: String,
        /// Failure reason.
        reason: String,
    },

    /// The same AI request for this vacancy is already running.
    #[error("Request already in flight for vacancy {0}")]
    InFlight(String),

    /// Vacancy is not part of the current result set.
    #[error("Vacancy not found: {0}")]
    VacancyNotFound(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if the session was torn down by this error.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Session(e) if e.is_unauthorized())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

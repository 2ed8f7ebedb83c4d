//! Applicant resume.

use serde::{Deserialize, Serialize};

/// Resume the applications are sent with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resume {
    /// Resume identifier.
    pub id: String,
    /// Applicant first name.
    #[serde(default)]
    pub first_name: String,
    /// Applicant last name.
    #[serde(default)]
    pub last_name: String,
    /// Desired position.
    #[serde(default)]
    pub title: String,
}

impl Resume {
    /// "First Last", trimmed when a part is missing.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

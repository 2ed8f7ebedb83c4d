//! Vacancy search filters.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Search form state.
///
/// A pasted hh.ru search URL takes precedence over the individual fields:
/// its query string is forwarded as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Full search URL copied from hh.ru.
    #[serde(default)]
    pub url: Option<String>,
    /// Keywords.
    #[serde(default)]
    pub text: String,
    /// Area id.
    #[serde(default)]
    pub area: String,
    /// Minimum salary.
    #[serde(default)]
    pub salary: Option<u32>,
    /// Only vacancies that state a salary.
    #[serde(default)]
    pub only_with_salary: bool,
    /// Experience dictionary id.
    #[serde(default)]
    pub experience: String,
    /// Employment dictionary id.
    #[serde(default)]
    pub employment: String,
    /// Schedule dictionary id.
    #[serde(default)]
    pub schedule: String,
}

impl SearchFilters {
    /// Filters matching the given keywords.
    #[must_use]
    pub fn keywords(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Filters taken from a pasted search URL.
    #[must_use]
    pub fn from_search_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Query parameters for `GET /api/vacancies`. Empty fields are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SearchFailed`] if the pasted URL does not parse.
    pub fn to_query(&self) -> Result<Vec<(String, String)>> {
        if let Some(raw) = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            let url = Url::parse(raw)
                .map_err(|e| Error::SearchFailed(format!("invalid search URL: {e}")))?;
            return Ok(url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect());
        }

        let mut query = Vec::new();
        let mut push = |key: &str, value: &str| {
            if !value.is_empty() {
                query.push((key.to_string(), value.to_string()));
            }
        };
        push("text", &self.text);
        push("area", &self.area);
        push("salary", &self.salary.map(|s| s.to_string()).unwrap_or_default());
        if self.only_with_salary {
            push("only_with_salary", "true");
        }
        push("experience", &self.experience);
        push("employment", &self.employment);
        push("schedule", &self.schedule);
        Ok(query)
    }
}

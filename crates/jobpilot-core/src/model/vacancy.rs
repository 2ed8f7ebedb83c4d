//! Vacancy models.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Object that only carries a display name (employer, area, schedule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    /// Display name.
    pub name: String,
}

impl NamedRef {
    /// Creates a named reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Offered salary range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salary {
    /// Lower bound.
    #[serde(default)]
    pub from: Option<u64>,
    /// Upper bound.
    #[serde(default)]
    pub to: Option<u64>,
    /// Currency code (e.g., "RUR").
    #[serde(default)]
    pub currency: Option<String>,
}

impl fmt::Display for Salary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(from) = self.from {
            parts.push(format!("from {from}"));
        }
        if let Some(to) = self.to {
            parts.push(format!("to {to}"));
        }
        if let Some(currency) = &self.currency {
            parts.push(currency.clone());
        }
        f.write_str(&parts.join(" "))
    }
}

/// Highlighted excerpts from the search index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Requirements excerpt.
    #[serde(default)]
    pub requirement: Option<String>,
    /// Responsibilities excerpt.
    #[serde(default)]
    pub responsibility: Option<String>,
}

/// Vacancy as returned by search. Never modified after the search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancySummary {
    /// Vacancy identifier.
    pub id: String,
    /// Job title.
    pub name: String,
    /// Employer.
    pub employer: NamedRef,
    /// Salary range.
    #[serde(default)]
    pub salary: Option<Salary>,
    /// Location.
    pub area: NamedRef,
    /// Search snippet.
    #[serde(default)]
    pub snippet: Option<Snippet>,
    /// Publication time as sent by the backend.
    #[serde(default)]
    pub published_at: Option<String>,
    /// Work schedule tag.
    #[serde(default)]
    pub schedule: Option<NamedRef>,
    /// Employment type tag.
    #[serde(default)]
    pub employment: Option<NamedRef>,
}

impl VacancySummary {
    /// Creates a minimal summary.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, employer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            employer: NamedRef::new(employer),
            salary: None,
            area: NamedRef::new(""),
            snippet: None,
            published_at: None,
            schedule: None,
            employment: None,
        }
    }

    /// Parses [`VacancySummary::published_at`]. Accepts RFC 3339 and the
    /// `+0300` offset form hh.ru uses.
    #[must_use]
    pub fn published(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.published_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
            .ok()
    }
}

/// Body of `GET /api/vacancy/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyDetail {
    /// Full description.
    #[serde(default)]
    pub description: Option<String>,
    /// Schedule name.
    #[serde(default)]
    pub schedule: Option<String>,
    /// Employment type name.
    #[serde(default)]
    pub employment: Option<String>,
}

/// Body of `POST /api/vacancy/{id}/analyze`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResponse {
    /// Match score, nominally 0-100.
    pub score: f64,
}

impl AnalysisResponse {
    /// Score clamped to 0-100 and rounded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn normalized(&self) -> u8 {
        if self.score.is_nan() {
            return 0;
        }
        self.score.clamp(0.0, 100.0).round() as u8
    }
}

/// Body of `POST /api/vacancy/{id}/generate-letter`.
#[derive(Debug, Clone, Deserialize)]
pub struct LetterResponse {
    /// Generated cover letter.
    pub content: String,
}

/// Body of `GET /api/vacancies`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Matching vacancies.
    #[serde(default)]
    pub items: Vec<VacancySummary>,
    /// Total matches reported by the platform.
    #[serde(default)]
    pub found: Option<u64>,
}

/// Client-side state layered over a summary.
///
/// Each field has one writer: detail fetches own `description`,
/// `description_loading`, `schedule` and `employment`; analysis owns
/// `ai_score` and `score_loading`; letter generation and user edits own
/// `ai_letter` and `letter_loading`; the user owns `selected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacancyEnrichment {
    /// Full description, once fetched.
    pub description: Option<String>,
    /// A detail fetch is in flight.
    pub description_loading: bool,
    /// Schedule name from the detail fetch.
    pub schedule: Option<String>,
    /// Employment type from the detail fetch.
    pub employment: Option<String>,
    /// AI match score (0-100).
    pub ai_score: Option<u8>,
    /// An analysis request is in flight.
    pub score_loading: bool,
    /// AI-generated or user-edited cover letter.
    pub ai_letter: Option<String>,
    /// A letter generation request is in flight.
    pub letter_loading: bool,
    /// Included in batch submission.
    pub selected: bool,
}

impl Default for VacancyEnrichment {
    fn default() -> Self {
        Self {
            description: None,
            description_loading: false,
            schedule: None,
            employment: None,
            ai_score: None,
            score_loading: false,
            ai_letter: None,
            letter_loading: false,
            selected: true,
        }
    }
}

/// Summary plus enrichment, the unit the board holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vacancy {
    /// Search result.
    pub summary: VacancySummary,
    /// Client-side state.
    pub enrichment: VacancyEnrichment,
}

impl Vacancy {
    /// Wraps a summary with default enrichment.
    #[must_use]
    pub fn new(summary: VacancySummary) -> Self {
        Self {
            summary,
            enrichment: VacancyEnrichment::default(),
        }
    }

    /// Vacancy identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.summary.id
    }

    /// Needs a detail fetch: no description and none in flight.
    #[must_use]
    pub const fn needs_detail(&self) -> bool {
        self.enrichment.description.is_none() && !self.enrichment.description_loading
    }

    /// Needs analysis: no score and none in flight.
    #[must_use]
    pub const fn needs_score(&self) -> bool {
        self.enrichment.ai_score.is_none() && !self.enrichment.score_loading
    }

    /// Needs a letter: none present and none in flight.
    #[must_use]
    pub const fn needs_letter(&self) -> bool {
        self.enrichment.ai_letter.is_none() && !self.enrichment.letter_loading
    }

    /// Selected and carrying a non-empty letter.
    #[must_use]
    pub fn is_submittable(&self) -> bool {
        self.enrichment.selected
            && self
                .enrichment
                .ai_letter
                .as_deref()
                .is_some_and(|letter| !letter.trim().is_empty())
    }

    /// Description, falling back to the snippet requirement, then the
    /// snippet responsibility. An empty description counts as missing.
    #[must_use]
    pub fn display_text(&self) -> &str {
        let snippet = self.summary.snippet.as_ref();
        self.enrichment
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .or_else(|| snippet.and_then(|s| s.requirement.as_deref()))
            .or_else(|| snippet.and_then(|s| s.responsibility.as_deref()))
            .unwrap_or_default()
    }

    /// Schedule name, preferring the detail fetch.
    #[must_use]
    pub fn schedule_name(&self) -> Option<&str> {
        self.enrichment
            .schedule
            .as_deref()
            .or_else(|| self.summary.schedule.as_ref().map(|s| s.name.as_str()))
    }

    /// Employment type name, preferring the detail fetch.
    #[must_use]
    pub fn employment_name(&self) -> Option<&str> {
        self.enrichment
            .employment
            .as_deref()
            .or_else(|| self.summary.employment.as_ref().map(|s| s.name.as_str()))
    }

    /// Score band for display.
    #[must_use]
    pub fn score_band(&self) -> Option<ScoreBand> {
        self.enrichment.ai_score.map(ScoreBand::from_score)
    }
}

/// Coarse grouping of AI scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    /// 70 and above.
    High,
    /// 40 to 69.
    Medium,
    /// Below 40.
    Low,
}

impl ScoreBand {
    /// Classifies a score.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= 70 {
            Self::High
        } else if score >= 40 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// How long ago a vacancy was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingAge {
    /// Less than a day.
    Today,
    /// One day.
    Yesterday,
    /// 2 to 6 days.
    Days(i64),
    /// 1 to 4 weeks.
    Weeks(i64),
    /// 30 days or more, in whole months.
    Months(i64),
}

impl PostingAge {
    /// Buckets the time between `published` and `now`.
    #[must_use]
    pub fn between(published: DateTime<FixedOffset>, now: DateTime<Utc>) -> Self {
        let days = (now - published.with_timezone(&Utc)).num_days().max(0);
        match days {
            0 => Self::Today,
            1 => Self::Yesterday,
            2..=6 => Self::Days(days),
            7..=29 => Self::Weeks(days / 7),
            _ => Self::Months(days / 30),
        }
    }
}

impl fmt::Display for PostingAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::Yesterday => f.write_str("yesterday"),
            Self::Days(n) => write!(f, "{n} days ago"),
            Self::Weeks(n) => write!(f, "{n} weeks ago"),
            Self::Months(n) => write!(f, "{n} months ago"),
        }
    }
}

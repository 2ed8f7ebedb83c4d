//! # jobpilot-core
//!
//! Client-side orchestration for a job search backend in front of hh.ru.
//!
//! This crate provides:
//! - Domain models for vacancies, resumes, dictionaries and areas
//! - A typed backend API gated by [`jobpilot_session::SessionManager`]
//! - A TTL response cache for dictionaries and areas
//! - The vacancy board: the current result set and its client state
//! - Sequential, rate-limited enrichment (details, AI scores, letters)
//! - Batch application submission with per-vacancy outcomes
//! - [`JobPilot`], the facade a front end drives
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use jobpilot_core::{Config, JobPilot, SearchFilters};
//! use jobpilot_session::{KeyringTokenStore, Location, MemoryLocation, TokenStore};
//!
//! let config = Config::from_env()?;
//! let location = MemoryLocation::new(config.redirect_uri.parse()?);
//! let pilot = JobPilot::from_config(
//!     &config,
//!     Arc::new(KeyringTokenStore::default()) as Arc<dyn TokenStore>,
//!     Arc::new(location) as Arc<dyn Location>,
//! )?;
//!
//! pilot.initialize().await?;
//! pilot.search(&SearchFilters::keywords("rust")).await?;
//! pilot.enrich().await?;
//! pilot.generate_all().await?;
//! if let Some(summary) = pilot.submit().await {
//!     println!("{summary}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod api;
pub mod board;
pub mod cache;
pub mod config;
pub mod enrichment;
mod error;
pub mod model;
pub mod pilot;
pub mod submit;
pub mod time;

#[cfg(test)]
mod test_support;

pub use api::BackendApi;
pub use board::{Claim, SharedBoard, VacancyBoard};
pub use cache::ResponseCache;
pub use config::Config;
pub use enrichment::{BatchReport, EnrichmentPipeline, EnrichmentReport};
pub use error::{Error, Result};
pub use model::{
    Area, Dictionaries, DictionaryItem, PostingAge, Resume, Salary, ScoreBand, SearchFilters,
    Vacancy, VacancyDetail, VacancyEnrichment, VacancySummary,
};
pub use pilot::JobPilot;
pub use submit::{
    Application, ApplicationBatchSubmitter, ApplicationOutcome, ApplicationResult,
    SubmissionSummary,
};
pub use time::{Clock, MockClock, SystemClock};

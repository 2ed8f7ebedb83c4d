//! Runtime configuration from the environment.

use std::time::Duration;

use crate::{Error, Result};

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default OAuth redirect / landing URL.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/";

/// Default spacing between vacancy detail fetches.
pub const DEFAULT_ENRICH_SPACING: Duration = Duration::from_millis(200);

/// Default response cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend base URL (`JOBPILOT_API_URL`).
    pub api_url: String,
    /// OAuth client identifier (`JOBPILOT_CLIENT_ID`).
    pub client_id: String,
    /// OAuth redirect URI and landing view (`JOBPILOT_REDIRECT_URI`).
    pub redirect_uri: String,
    /// Minimum gap between detail fetches (`JOBPILOT_ENRICH_SPACING_MS`).
    pub enrich_spacing: Duration,
    /// TTL for cached dictionaries and areas (`JOBPILOT_CACHE_TTL_SECS`).
    pub cache_ttl: Duration,
}

impl Config {
    /// Loads configuration from the process environment, reading `.env`
    /// first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if `JOBPILOT_CLIENT_ID` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let client_id = lookup("JOBPILOT_CLIENT_ID")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config("JOBPILOT_CLIENT_ID is not set".into()))?;

        let enrich_spacing = match lookup("JOBPILOT_ENRICH_SPACING_MS") {
            Some(raw) => Duration::from_millis(parse_number("JOBPILOT_ENRICH_SPACING_MS", &raw)?),
            None => DEFAULT_ENRICH_SPACING,
        };
        let cache_ttl = match lookup("JOBPILOT_CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(parse_number("JOBPILOT_CACHE_TTL_SECS", &raw)?),
            None => DEFAULT_CACHE_TTL,
        };

        Ok(Self {
            api_url: lookup("JOBPILOT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            client_id,
            redirect_uri: lookup("JOBPILOT_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            enrich_spacing,
            cache_ttl,
        })
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

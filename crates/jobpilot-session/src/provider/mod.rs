//! `OAuth2` provider configuration.
//!
//! Only the authorization endpoint is needed client-side: the code exchange
//! itself runs on the jobpilot backend.

use crate::error::{Error, Result};
use url::Url;

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "HeadHunter").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or not http(s).
    pub fn new(name: impl Into<String>, auth_url: impl AsRef<str>) -> Result<Self> {
        let provider = Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
        };
        provider.validate()?;
        Ok(provider)
    }

    /// hh.ru provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn headhunter() -> Result<Self> {
        Self::new("HeadHunter", "https://hh.ru/oauth/authorize")
    }

    /// Builds the authorization URL the user is sent to for consent.
    ///
    /// # Arguments
    ///
    /// * `client_id` - OAuth client identifier
    /// * `redirect_uri` - Where the provider sends the user back with `?code=`
    /// * `state` - Optional state parameter for CSRF protection
    #[must_use]
    pub fn authorization_url(&self, client_id: &str, redirect_uri: &str, state: Option<&str>) -> Url {
        let mut url = self.auth_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("response_type", "code")
                .append_pair("client_id", client_id)
                .append_pair("redirect_uri", redirect_uri);

            if let Some(state_val) = state {
                pairs.append_pair("state", state_val);
            }
        }
        url
    }

    fn validate(&self) -> Result<()> {
        match self.auth_url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(Error::InvalidConfig(format!(
                "auth_url scheme must be http or https, got {other}"
            ))),
        }
    }
}

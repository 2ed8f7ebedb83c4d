//! Access to the visible URL of the embedding page.
//!
//! The OAuth redirect lands on the application with `?code=...` in the
//! address bar. [`Location`] lets the session read that code, scrub it from
//! history so a reload cannot replay it, and send the user back to the
//! landing view when the session dies.

use std::sync::{Mutex, PoisonError};

use url::Url;

/// Query parameter carrying the authorization code.
const CODE_PARAM: &str = "code";

/// Query parameter carrying the OAuth state.
const STATE_PARAM: &str = "state";

/// URL and history facility.
pub trait Location: Send + Sync {
    /// Returns the current URL.
    fn current(&self) -> Url;

    /// Replaces the current history entry without navigating.
    fn replace(&self, url: Url);

    /// Navigates to `url`.
    fn navigate(&self, url: Url);
}

/// Extracts the authorization code from a redirect URL.
#[must_use]
pub fn auth_code_from_url(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == CODE_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Returns `url` with the OAuth `code` and `state` parameters removed.
#[must_use]
pub fn without_auth_code(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != CODE_PARAM && key != STATE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

/// In-memory [`Location`] for headless use and tests.
#[derive(Debug)]
pub struct MemoryLocation {
    current: Mutex<Url>,
    navigations: Mutex<Vec<Url>>,
}

impl MemoryLocation {
    /// Creates a location showing `url`.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            current: Mutex::new(url),
            navigations: Mutex::new(Vec::new()),
        }
    }

    /// URLs passed to [`Location::navigate`], oldest first.
    #[must_use]
    pub fn navigations(&self) -> Vec<Url> {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Location for MemoryLocation {
    fn current(&self) -> Url {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, url: Url) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = url;
    }

    fn navigate(&self, url: Url) {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());
        self.replace(url);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_auth_code_from_url() {
        assert_eq!(
            auth_code_from_url(&url("http://localhost:3000/?code=abc123")).as_deref(),
            Some("abc123")
        );
        assert_eq!(auth_code_from_url(&url("http://localhost:3000/")), None);
        assert_eq!(auth_code_from_url(&url("http://localhost:3000/?code=")), None);
    }

    #[test]
    fn test_without_auth_code_keeps_other_params() {
        let cleaned = without_auth_code(&url("http://localhost:3000/?code=abc&state=s&tab=2"));
        assert_eq!(cleaned.as_str(), "http://localhost:3000/?tab=2");

        let bare = without_auth_code(&url("http://localhost:3000/?code=abc"));
        assert_eq!(bare.as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_memory_location_records_navigation() {
        let location = MemoryLocation::new(url("http://localhost:3000/app"));
        location.replace(url("http://localhost:3000/app?x=1"));
        assert!(location.navigations().is_empty());

        location.navigate(url("http://localhost:3000/"));
        assert_eq!(location.current().as_str(), "http://localhost:3000/");
        assert_eq!(location.navigations().len(), 1);
    }
}

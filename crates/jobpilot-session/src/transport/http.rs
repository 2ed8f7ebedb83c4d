//! reqwest-backed transport.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::Result;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Transport`] that talks HTTP to the backend.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    http_client: Client,
}

impl HttpTransport {
    /// Creates a transport for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a transport with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url.as_ref())?,
            http_client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Returns the backend base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.endpoint(&request.path)?;
        debug!(method = ?request.method, %url, "Sending backend request");

        let mut builder = match request.method {
            Method::Get => self.http_client.get(url),
            Method::Post => self.http_client.post(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(status, bytes = body.len(), "Backend responded");

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_and_path() {
        let transport = HttpTransport::new("http://localhost:8000/").unwrap();
        assert_eq!(
            transport.endpoint("/api/vacancy/42").unwrap().as_str(),
            "http://localhost:8000/api/vacancy/42"
        );

        let prefixed = HttpTransport::new("https://example.com/proxy").unwrap();
        assert_eq!(
            prefixed.endpoint("/api/resume").unwrap().as_str(),
            "https://example.com/proxy/api/resume"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpTransport::new("not a url").is_err());
    }
}

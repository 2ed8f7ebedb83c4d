//! Typed access to the jobpilot backend.
//!
//! Every call goes through the shared [`SessionManager`], so a 401 from any
//! endpoint ends the session. Dictionaries and areas are memoized in a
//! [`ResponseCache`]; nothing else is cached.

use std::sync::Arc;

use jobpilot_session::{Access, ApiRequest, SessionManager, Transport};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::model::{
    AnalysisResponse, Area, Dictionaries, LetterResponse, Resume, SearchFilters, SearchResponse,
    VacancyDetail, VacancySummary,
};
use crate::{Error, Result};

const DICTIONARIES_KEY: &str = "dictionaries";
const AREAS_KEY: &str = "areas";

/// Backend endpoints.
pub struct BackendApi<T> {
    session: Arc<SessionManager<T>>,
    cache: ResponseCache,
}

impl<T> std::fmt::Debug for BackendApi<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendApi")
            .field("session", &self.session)
            .field("cache", &self.cache)
            .finish()
    }
}

impl<T: Transport> BackendApi<T> {
    /// Creates the API over a shared session.
    #[must_use]
    pub const fn new(session: Arc<SessionManager<T>>, cache: ResponseCache) -> Self {
        Self { session, cache }
    }

    /// The session every call goes through.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionManager<T>> {
        &self.session
    }

    /// The dictionary/area cache.
    #[must_use]
    pub const fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Fetches the applicant's resume.
    ///
    /// # Errors
    ///
    /// Returns a session error if unauthenticated or the call fails.
    pub async fn resume(&self) -> Result<Resume> {
        self.fetch(ApiRequest::get("/api/resume"), Access::Authenticated)
            .await
    }

    /// Fetches the filter dictionaries, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns a session error if the call fails.
    pub async fn dictionaries(&self) -> Result<Dictionaries> {
        self.cached(DICTIONARIES_KEY, ApiRequest::get("/api/dictionaries"))
            .await
    }

    /// Fetches the area tree, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns a session error if the call fails.
    pub async fn areas(&self) -> Result<Vec<Area>> {
        self.cached(AREAS_KEY, ApiRequest::get("/api/areas")).await
    }

    /// Searches vacancies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SearchFailed`] for invalid filters or backend errors,
    /// or the session's `Unauthorized` error.
    pub async fn search(&self, filters: &SearchFilters) -> Result<Vec<VacancySummary>> {
        let query = filters.to_query()?;
        debug!(params = query.len(), "Searching vacancies");
        let request = ApiRequest::get("/api/vacancies").query_pairs(query);
        let response: SearchResponse = self
            .fetch(request, Access::Authenticated)
            .await
            .map_err(|e| keep_unauthorized(e, Error::SearchFailed))?;
        Ok(response.items)
    }

    /// Fetches the full detail of one vacancy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EnrichmentFailed`], or the session's `Unauthorized`
    /// error.
    pub async fn vacancy_detail(&self, id: &str) -> Result<VacancyDetail> {
        self.fetch(
            ApiRequest::get(format!("/api/vacancy/{id}")),
            Access::Authenticated,
        )
        .await
        .map_err(|e| {
            keep_unauthorized(e, |reason| Error::EnrichmentFailed {
                id: id.to_string(),
                reason,
            })
        })
    }

    /// Asks the backend to score one vacancy against the resume.
    ///
    /// # Errors
    ///
    /// Returns a session error if the call fails.
    pub async fn analyze(&self, id: &str) -> Result<u8> {
        let response: AnalysisResponse = self
            .fetch(
                ApiRequest::post(format!("/api/vacancy/{id}/analyze")),
                Access::Authenticated,
            )
            .await?;
        Ok(response.normalized())
    }

    /// Asks the backend to write a cover letter for one vacancy.
    ///
    /// # Errors
    ///
    /// Returns a session error if the call fails.
    pub async fn generate_letter(&self, id: &str) -> Result<String> {
        let response: LetterResponse = self
            .fetch(
                ApiRequest::post(format!("/api/vacancy/{id}/generate-letter")),
                Access::Authenticated,
            )
            .await?;
        Ok(response.content)
    }

    /// Applies to one vacancy with `message` as the cover letter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubmissionFailed`], or the session's `Unauthorized`
    /// error.
    pub async fn apply(&self, id: &str, message: &str) -> Result<()> {
        let request =
            ApiRequest::post(format!("/api/vacancy/{id}/apply")).json(json!({ "message": message }));
        self.session
            .send(request, Access::Authenticated)
            .await
            .map(drop)
            .map_err(|e| {
                keep_unauthorized(e.into(), |reason| Error::SubmissionFailed {
                    id: id.to_string(),
                    reason,
                })
            })
    }

    async fn fetch<R: DeserializeOwned>(&self, request: ApiRequest, access: Access) -> Result<R> {
        Ok(self.session.send_json(request, access).await?)
    }

    async fn cached<R>(&self, key: &str, request: ApiRequest) -> Result<R>
    where
        R: DeserializeOwned + serde::Serialize,
    {
        if let Some(hit) = self.cache.get_as(key) {
            return Ok(hit);
        }
        let value: R = self.fetch(request, Access::Public).await?;
        self.cache.put(key, &value)?;
        Ok(value)
    }
}

/// Rewraps a failure with `wrap`, except a 401 which stays a session error.
fn keep_unauthorized(error: Error, wrap: impl FnOnce(String) -> Error) -> Error {
    match error {
        e if e.is_unauthorized() => e,
        Error::Session(inner) => wrap(inner.to_string()),
        other => wrap(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jobpilot_session::{ApiResponse, Method};

    use super::*;
    use crate::test_support::{MockBackend, session};

    fn api(backend: &MockBackend) -> BackendApi<MockBackend> {
        BackendApi::new(session(backend), ResponseCache::new())
    }

    #[tokio::test]
    async fn test_dictionaries_are_cached() {
        let backend = MockBackend::new();
        backend.route(
            Method::Get,
            "/api/dictionaries",
            ApiResponse::json(200, &json!({"schedule": [{"id": "remote", "name": "Remote"}]})),
        );
        let api = api(&backend);

        let first = api.dictionaries().await.unwrap();
        let second = api.dictionaries().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.schedule[0].id, "remote");
        assert_eq!(backend.calls_to("/api/dictionaries"), 1);
    }

    #[tokio::test]
    async fn test_search_sends_filters_and_bearer() {
        let backend = MockBackend::new();
        backend.route(
            Method::Get,
            "/api/vacancies",
            ApiResponse::json(
                200,
                &json!({"items": [{"id": "7", "name": "Dev", "employer": {"name": "Acme"}, "area": {"name": "Moscow"}}]}),
            ),
        );
        let api = api(&backend);

        let items = api.search(&SearchFilters::keywords("rust")).await.unwrap();

        assert_eq!(items.len(), 1);
        let request = &backend.requests()[0];
        assert_eq!(request.query, vec![("text".into(), "rust".into())]);
        assert_eq!(request.header("authorization"), Some("Bearer jwt"));
    }

    #[tokio::test]
    async fn test_search_backend_error_is_search_failure() {
        let backend = MockBackend::new();
        backend.route(
            Method::Get,
            "/api/vacancies",
            ApiResponse::json(502, &json!({"detail": "upstream down"})),
        );

        let err = api(&backend)
            .search(&SearchFilters::keywords("rust"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SearchFailed(ref m) if m.contains("upstream down")));
    }

    #[tokio::test]
    async fn test_search_unauthorized_stays_session_error() {
        let backend = MockBackend::new();
        backend.route(Method::Get, "/api/vacancies", ApiResponse::new(401, ""));
        let api = api(&backend);

        let err = api.search(&SearchFilters::default()).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!api.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_detail_failure_names_vacancy() {
        let backend = MockBackend::new();
        let err = api(&backend).vacancy_detail("42").await.unwrap_err();
        assert!(matches!(err, Error::EnrichmentFailed { ref id, .. } if id == "42"));
    }

    #[tokio::test]
    async fn test_apply_posts_message() {
        let backend = MockBackend::new();
        backend.route(Method::Post, "/api/vacancy/9/apply", ApiResponse::new(200, "{}"));

        api(&backend).apply("9", "Hello").await.unwrap();

        let request = &backend.requests()[0];
        assert_eq!(request.body, Some(json!({"message": "Hello"})));
    }

    #[tokio::test]
    async fn test_analyze_and_generate() {
        let backend = MockBackend::new();
        backend
            .route(
                Method::Post,
                "/api/vacancy/3/analyze",
                ApiResponse::json(200, &json!({"score": 81.6})),
            )
            .route(
                Method::Post,
                "/api/vacancy/3/generate-letter",
                ApiResponse::json(200, &json!({"content": "Dear Acme"})),
            );
        let api = api(&backend);

        assert_eq!(api.analyze("3").await.unwrap(), 82);
        assert_eq!(api.generate_letter("3").await.unwrap(), "Dear Acme");
    }
}

//! Scripted backend for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use jobpilot_session::{
    ApiRequest, ApiResponse, Location, MemoryLocation, MemoryTokenStore, Method, SessionConfig,
    SessionManager, TokenStore, Transport,
};
use url::Url;

use crate::model::VacancySummary;

#[derive(Default)]
struct Inner {
    routes: Mutex<HashMap<(Method, String), VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
    latency: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Transport answering from per-route response queues. The last queued
/// response of a route is repeated; unknown routes answer 404.
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Inner>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, method: Method, path: &str, response: ApiResponse) -> &Self {
        self.inner
            .routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock().unwrap() = latency;
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &ApiRequest) -> ApiResponse {
        let mut routes = self.inner.routes.lock().unwrap();
        let Some(queue) = routes.get_mut(&(request.method, request.path.clone())) else {
            return ApiResponse::new(404, r#"{"detail":"not found"}"#);
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

impl Transport for MockBackend {
    async fn execute(&self, request: ApiRequest) -> jobpilot_session::Result<ApiResponse> {
        let current = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = *self.inner.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let response = self.respond(&request);
        self.inner.requests.lock().unwrap().push(request);
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }
}

/// Session over `backend` restored from a stored token.
pub fn session(backend: &MockBackend) -> Arc<SessionManager<MockBackend>> {
    let store = MemoryTokenStore::with_access_token("jwt", Utc::now() + ChronoDuration::hours(1));
    let location = MemoryLocation::new(Url::parse("http://localhost:3000/").unwrap());
    let session = SessionManager::new(
        backend.clone(),
        Arc::new(store) as Arc<dyn TokenStore>,
        Arc::new(location) as Arc<dyn Location>,
        SessionConfig::new("client", "http://localhost:3000/").unwrap(),
    );
    assert!(session.restore());
    Arc::new(session)
}

pub fn summaries(ids: &[&str]) -> Vec<VacancySummary> {
    ids.iter()
        .map(|id| VacancySummary::new(*id, format!("Vacancy {id}"), "Acme"))
        .collect()
}

//! Background enrichment of the result set.
//!
//! ## Design
//!
//! A single worker drains the vacancies that still lack a description, in
//! board order, one request at a time. The worker lock also remembers when
//! the last detail fetch completed, so the minimum spacing holds across
//! back-to-back passes as well as within one. A pass reads the board
//! generation once; when the board is replaced underneath it, its results
//! are dropped and the pass stops.
//!
//! Analysis and letter generation are separate sequential passes that only
//! fill what is missing. They claim each vacancy on the board before the
//! request, so overlapping passes and single calls never send the same
//! request twice.

use std::sync::Arc;
use std::time::Duration;

use jobpilot_session::Transport;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::BackendApi;
use crate::board::{Claim, SharedBoard};
use crate::{Error, Result};

/// Result of one detail pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Descriptions merged.
    pub fetched: usize,
    /// Fetches that failed; those vacancies fall back to their snippet.
    pub failed: usize,
    /// The board was replaced during the pass.
    pub superseded: bool,
}

/// Result of an analyze or generate pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Requests made.
    pub attempted: usize,
    /// Requests whose result was stored.
    pub succeeded: usize,
}

/// Sequential, rate-limited enrichment worker.
pub struct EnrichmentPipeline<T> {
    api: Arc<BackendApi<T>>,
    board: SharedBoard,
    spacing: Duration,
    worker: Mutex<Option<Instant>>,
}

impl<T> std::fmt::Debug for EnrichmentPipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentPipeline")
            .field("spacing", &self.spacing)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> EnrichmentPipeline<T> {
    /// Creates a pipeline writing into `board`.
    #[must_use]
    pub fn new(api: Arc<BackendApi<T>>, board: SharedBoard, spacing: Duration) -> Self {
        Self {
            api,
            board,
            spacing,
            worker: Mutex::new(None),
        }
    }

    /// Fetches the detail of every vacancy that lacks a description.
    ///
    /// Concurrent calls queue behind one another; a later call skips what an
    /// earlier one already described. Per-vacancy failures are logged and
    /// counted, not returned.
    ///
    /// # Errors
    ///
    /// Returns the session's `Unauthorized` error if the session ended
    /// during the pass.
    pub async fn run(&self) -> Result<EnrichmentReport> {
        let mut last_fetch = self.worker.lock().await;

        let (generation, pending) = {
            let board = self.board.lock();
            (board.generation(), board.pending_detail_ids())
        };
        debug!(generation, pending = pending.len(), "Enrichment pass started");

        let mut report = EnrichmentReport::default();
        for id in pending {
            let claim = self.board.lock().claim_detail(generation, &id);
            match claim {
                Claim::Claimed => {}
                Claim::Skipped => continue,
                Claim::Superseded => {
                    report.superseded = true;
                    break;
                }
            }

            if let Some(at) = *last_fetch {
                tokio::time::sleep_until(at + self.spacing).await;
            }
            let outcome = self.api.vacancy_detail(&id).await;
            *last_fetch = Some(Instant::now());

            match outcome {
                Ok(detail) => {
                    let merged = self.board.lock().merge_detail(generation, &id, detail);
                    if !merged {
                        report.superseded = true;
                        break;
                    }
                    report.fetched += 1;
                }
                Err(e) => {
                    self.board.lock().fail_detail(generation, &id);
                    if e.is_unauthorized() {
                        return Err(e);
                    }
                    warn!("{e}");
                    report.failed += 1;
                }
            }
        }

        debug!(?report, "Enrichment pass finished");
        Ok(report)
    }

    /// Runs a detail pass on the runtime without waiting for it.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<Result<EnrichmentReport>> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run().await })
    }

    /// Scores every vacancy that has no score yet.
    ///
    /// # Errors
    ///
    /// Returns the session's `Unauthorized` error if the session ended
    /// during the pass.
    pub async fn analyze_all(&self) -> Result<BatchReport> {
        let ids = self.board.lock().unscored_ids();
        let mut report = BatchReport::default();
        for id in ids {
            if !matches!(self.board.lock().claim_score(&id, false), Ok(true)) {
                continue;
            }
            report.attempted += 1;
            let outcome = self.api.analyze(&id).await;
            let score = outcome.as_ref().ok().copied();
            if self.board.lock().finish_score(&id, score) {
                report.succeeded += 1;
            }
            match outcome {
                Err(e) if e.is_unauthorized() => return Err(e),
                Err(e) => warn!(id = %id, "Analysis failed: {e}"),
                Ok(_) => {}
            }
        }
        info!(attempted = report.attempted, succeeded = report.succeeded, "Analysis pass finished");
        Ok(report)
    }

    /// Generates a letter for every vacancy that has none. A letter written
    /// by the user while the pass runs is kept.
    ///
    /// # Errors
    ///
    /// Returns the session's `Unauthorized` error if the session ended
    /// during the pass.
    pub async fn generate_all(&self) -> Result<BatchReport> {
        let ids = self.board.lock().letterless_ids();
        let mut report = BatchReport::default();
        for id in ids {
            if !matches!(self.board.lock().claim_letter(&id, false), Ok(true)) {
                continue;
            }
            report.attempted += 1;
            match self.api.generate_letter(&id).await {
                Ok(letter) => {
                    if self.board.lock().finish_letter(&id, Some(letter), false) {
                        report.succeeded += 1;
                    }
                }
                Err(e) => {
                    self.board.lock().finish_letter(&id, None, false);
                    if e.is_unauthorized() {
                        return Err(e);
                    }
                    warn!(id = %id, "Letter generation failed: {e}");
                }
            }
        }
        info!(attempted = report.attempted, succeeded = report.succeeded, "Letter pass finished");
        Ok(report)
    }

    /// Scores one vacancy, replacing any existing score.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VacancyNotFound`] if `id` is not on the board,
    /// [`Error::InFlight`] if it is being analyzed already, or the request
    /// error.
    pub async fn analyze(&self, id: &str) -> Result<u8> {
        if !self.board.lock().claim_score(id, true)? {
            return Err(Error::InFlight(id.to_string()));
        }
        let outcome = self.api.analyze(id).await;
        self.board.lock().finish_score(id, outcome.as_ref().ok().copied());
        outcome
    }

    /// Generates a letter for one vacancy, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VacancyNotFound`] if `id` is not on the board,
    /// [`Error::InFlight`] if a letter is being generated already, or the
    /// request error.
    pub async fn generate_letter(&self, id: &str) -> Result<String> {
        if !self.board.lock().claim_letter(id, true)? {
            return Err(Error::InFlight(id.to_string()));
        }
        let outcome = self.api.generate_letter(id).await;
        self.board
            .lock()
            .finish_letter(id, outcome.as_ref().ok().cloned(), true);
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jobpilot_session::{ApiResponse, Method};
    use serde_json::json;

    use super::*;
    use crate::cache::ResponseCache;
    use crate::test_support::{MockBackend, session, summaries};

    fn pipeline(backend: &MockBackend, ids: &[&str]) -> (SharedBoard, EnrichmentPipeline<MockBackend>) {
        let api = Arc::new(BackendApi::new(session(backend), ResponseCache::new()));
        let board = SharedBoard::new();
        board.lock().replace(summaries(ids));
        let pipeline = EnrichmentPipeline::new(api, board.clone(), Duration::from_millis(200));
        (board, pipeline)
    }

    fn detail_route(backend: &MockBackend, id: &str) {
        backend.route(
            Method::Get,
            &format!("/api/vacancy/{id}"),
            ApiResponse::json(200, &json!({"description": format!("about {id}"), "employment": "Full"})),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fills_descriptions_with_spacing() {
        let backend = MockBackend::new();
        detail_route(&backend, "1");
        detail_route(&backend, "2");
        detail_route(&backend, "3");
        let (board, pipeline) = pipeline(&backend, &["1", "2", "3"]);

        let start = Instant::now();
        let report = pipeline.run().await.unwrap();

        assert_eq!(report.fetched, 3);
        assert!(start.elapsed() >= Duration::from_millis(400));
        let vacancy = board.lock().get("2").cloned().unwrap();
        assert_eq!(vacancy.enrichment.description.as_deref(), Some("about 2"));
        assert_eq!(vacancy.employment_name(), Some("Full"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_detail_degrades_and_continues() {
        let backend = MockBackend::new();
        detail_route(&backend, "2");
        let (board, pipeline) = pipeline(&backend, &["1", "2"]);

        let report = pipeline.run().await.unwrap();

        assert_eq!(report, EnrichmentReport { fetched: 1, failed: 1, superseded: false });
        let first = board.lock().get("1").cloned().unwrap();
        assert!(first.enrichment.description.is_none());
        assert!(!first.enrichment.description_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_does_not_refetch() {
        let backend = MockBackend::new();
        detail_route(&backend, "1");
        let (_board, pipeline) = pipeline(&backend, &["1"]);

        pipeline.run().await.unwrap();
        let report = pipeline.run().await.unwrap();

        assert_eq!(report.fetched, 0);
        assert_eq!(backend.calls_to("/api/vacancy/1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_keep_one_fetch_in_flight() {
        let backend = MockBackend::new();
        backend.set_latency(Duration::from_millis(30));
        for id in ["1", "2", "3"] {
            detail_route(&backend, id);
        }
        let (_board, pipeline) = pipeline(&backend, &["1", "2", "3"]);
        let pipeline = Arc::new(pipeline);

        let background = pipeline.spawn();
        let foreground = pipeline.run().await.unwrap();
        let background = background.await.unwrap().unwrap();

        assert_eq!(foreground.fetched + background.fetched, 3);
        assert_eq!(backend.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_analyze_all_skips_scored() {
        let backend = MockBackend::new();
        backend.route(
            Method::Post,
            "/api/vacancy/2/analyze",
            ApiResponse::json(200, &json!({"score": 64})),
        );
        let (board, pipeline) = pipeline(&backend, &["1", "2"]);
        board.lock().finish_score("1", Some(90));

        let report = pipeline.analyze_all().await.unwrap();

        assert_eq!(report, BatchReport { attempted: 1, succeeded: 1 });
        assert_eq!(board.lock().get("2").unwrap().enrichment.ai_score, Some(64));
        assert_eq!(backend.calls_to("/api/vacancy/1/analyze"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_ai_passes_send_each_request_once() {
        let backend = MockBackend::new();
        backend.set_latency(Duration::from_millis(30));
        for id in ["1", "2"] {
            backend.route(
                Method::Post,
                &format!("/api/vacancy/{id}/analyze"),
                ApiResponse::json(200, &json!({"score": 70})),
            );
            backend.route(
                Method::Post,
                &format!("/api/vacancy/{id}/generate-letter"),
                ApiResponse::json(200, &json!({"content": "Dear team"})),
            );
        }
        let (board, pipeline) = pipeline(&backend, &["1", "2"]);

        let (a, b) = tokio::join!(pipeline.analyze_all(), pipeline.analyze_all());
        assert_eq!(a.unwrap().succeeded + b.unwrap().succeeded, 2);
        let (a, b) = tokio::join!(pipeline.generate_all(), pipeline.generate_all());
        assert_eq!(a.unwrap().succeeded + b.unwrap().succeeded, 2);

        for id in ["1", "2"] {
            assert_eq!(backend.calls_to(&format!("/api/vacancy/{id}/analyze")), 1);
            assert_eq!(backend.calls_to(&format!("/api/vacancy/{id}/generate-letter")), 1);
        }
        assert_eq!(board.lock().submittable_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_analysis_refused_while_pass_holds_it() {
        let backend = MockBackend::new();
        backend.set_latency(Duration::from_millis(30));
        backend.route(
            Method::Post,
            "/api/vacancy/1/analyze",
            ApiResponse::json(200, &json!({"score": 42})),
        );
        let (board, pipeline) = pipeline(&backend, &["1"]);

        let (pass, single) = tokio::join!(pipeline.analyze_all(), pipeline.analyze("1"));

        assert_eq!(pass.unwrap(), BatchReport { attempted: 1, succeeded: 1 });
        assert!(matches!(single, Err(Error::InFlight(_))));
        assert_eq!(backend.calls_to("/api/vacancy/1/analyze"), 1);
        let vacancy = board.lock().get("1").cloned().unwrap();
        assert_eq!(vacancy.enrichment.ai_score, Some(42));
        assert!(!vacancy.enrichment.score_loading);
    }

    #[tokio::test]
    async fn test_generate_all_isolates_failures() {
        let backend = MockBackend::new();
        backend.route(
            Method::Post,
            "/api/vacancy/2/generate-letter",
            ApiResponse::json(200, &json!({"content": "Dear team"})),
        );
        let (board, pipeline) = pipeline(&backend, &["1", "2"]);

        let report = pipeline.generate_all().await.unwrap();

        assert_eq!(report, BatchReport { attempted: 2, succeeded: 1 });
        assert!(board.lock().get("1").unwrap().enrichment.ai_letter.is_none());
        assert_eq!(board.lock().submittable_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_letter_overwrites() {
        let backend = MockBackend::new();
        backend.route(
            Method::Post,
            "/api/vacancy/1/generate-letter",
            ApiResponse::json(200, &json!({"content": "fresh"})),
        );
        let (board, pipeline) = pipeline(&backend, &["1"]);
        board.lock().set_letter("1", "old").unwrap();

        assert_eq!(pipeline.generate_letter("1").await.unwrap(), "fresh");
        assert_eq!(board.lock().get("1").unwrap().enrichment.ai_letter.as_deref(), Some("fresh"));

        let err = pipeline.generate_letter("9").await.unwrap_err();
        assert!(matches!(err, Error::VacancyNotFound(_)));
        assert_eq!(backend.requests().len(), 1);
    }
}

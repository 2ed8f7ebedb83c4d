//! Batch application submission.
//!
//! Each selected vacancy is applied to on its own; one failure is recorded
//! and the batch moves on. Nothing is retried.

use std::fmt;
use std::sync::Arc;

use jobpilot_session::Transport;
use tracing::{debug, info, warn};

use crate::api::BackendApi;
use crate::board::SharedBoard;

/// One application to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    /// Vacancy identifier.
    pub vacancy_id: String,
    /// Cover letter.
    pub message: String,
}

impl Application {
    /// Creates an application.
    #[must_use]
    pub fn new(vacancy_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            vacancy_id: vacancy_id.into(),
            message: message.into(),
        }
    }
}

/// Outcome of one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationResult {
    /// Accepted by the backend.
    Sent,
    /// Rejected or not delivered.
    Failed(String),
}

impl ApplicationResult {
    /// Returns true for [`ApplicationResult::Sent`].
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Outcome of one application, keyed by vacancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationOutcome {
    /// Vacancy identifier.
    pub vacancy_id: String,
    /// What happened.
    pub result: ApplicationResult,
}

/// Aggregate of a batch submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionSummary {
    /// Applications attempted.
    pub attempted: usize,
    /// Applications accepted.
    pub succeeded: usize,
    /// Per-vacancy outcomes, in submission order.
    pub outcomes: Vec<ApplicationOutcome>,
}

impl SubmissionSummary {
    /// Applications that failed.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.attempted.saturating_sub(self.succeeded)
    }

    fn record(mut self, vacancy_id: String, result: ApplicationResult) -> Self {
        self.attempted += 1;
        if result.is_sent() {
            self.succeeded += 1;
        }
        self.outcomes.push(ApplicationOutcome { vacancy_id, result });
        self
    }
}

impl fmt::Display for SubmissionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sent {} of {} applications", self.succeeded, self.attempted)
    }
}

/// Sends applications one after another.
pub struct ApplicationBatchSubmitter<T> {
    api: Arc<BackendApi<T>>,
}

impl<T> fmt::Debug for ApplicationBatchSubmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationBatchSubmitter").finish_non_exhaustive()
    }
}

impl<T: Transport> ApplicationBatchSubmitter<T> {
    /// Creates a submitter.
    #[must_use]
    pub const fn new(api: Arc<BackendApi<T>>) -> Self {
        Self { api }
    }

    /// Submits every application in order.
    ///
    /// Returns `None` without any request when `selection` is empty.
    pub async fn submit(&self, selection: Vec<Application>) -> Option<SubmissionSummary> {
        if selection.is_empty() {
            debug!("Nothing selected for submission");
            return None;
        }

        let mut summary = SubmissionSummary::default();
        for application in selection {
            let result = match self
                .api
                .apply(&application.vacancy_id, &application.message)
                .await
            {
                Ok(()) => ApplicationResult::Sent,
                Err(e) => {
                    warn!("{e}");
                    ApplicationResult::Failed(e.to_string())
                }
            };
            summary = summary.record(application.vacancy_id, result);
        }

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            "Batch submission finished"
        );
        Some(summary)
    }

    /// Submits the board's selected, letter-bearing vacancies.
    pub async fn submit_board(&self, board: &SharedBoard) -> Option<SubmissionSummary> {
        let selection: Vec<Application> = board
            .lock()
            .submittable()
            .into_iter()
            .map(|(id, letter)| Application::new(id, letter))
            .collect();
        self.submit(selection).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jobpilot_session::{ApiResponse, Method};

    use super::*;
    use crate::cache::ResponseCache;
    use crate::test_support::{MockBackend, session, summaries};

    fn submitter(backend: &MockBackend) -> ApplicationBatchSubmitter<MockBackend> {
        let api = Arc::new(BackendApi::new(session(backend), ResponseCache::new()));
        ApplicationBatchSubmitter::new(api)
    }

    #[tokio::test]
    async fn test_empty_selection_makes_no_calls() {
        let backend = MockBackend::new();
        assert_eq!(submitter(&backend).submit(Vec::new()).await, None);
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let backend = MockBackend::new();
        backend
            .route(Method::Post, "/api/vacancy/1/apply", ApiResponse::new(200, "{}"))
            .route(
                Method::Post,
                "/api/vacancy/2/apply",
                ApiResponse::new(400, r#"{"detail":"already applied"}"#),
            )
            .route(Method::Post, "/api/vacancy/3/apply", ApiResponse::new(200, "{}"));

        let summary = submitter(&backend)
            .submit(vec![
                Application::new("1", "a"),
                Application::new("2", "b"),
                Application::new("3", "c"),
            ])
            .await
            .unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.to_string(), "Sent 2 of 3 applications");
        assert!(matches!(
            &summary.outcomes[1].result,
            ApplicationResult::Failed(reason) if reason.contains("already applied")
        ));
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_unauthorized_mid_batch_fails_rest_locally() {
        let backend = MockBackend::new();
        backend
            .route(Method::Post, "/api/vacancy/1/apply", ApiResponse::new(200, "{}"))
            .route(Method::Post, "/api/vacancy/2/apply", ApiResponse::new(401, ""))
            .route(Method::Post, "/api/vacancy/3/apply", ApiResponse::new(200, "{}"))
            .route(Method::Post, "/api/vacancy/4/apply", ApiResponse::new(200, "{}"));

        let summary = submitter(&backend)
            .submit(vec![
                Application::new("1", "a"),
                Application::new("2", "b"),
                Application::new("3", "c"),
                Application::new("4", "d"),
            ])
            .await
            .unwrap();

        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed(), 3);
        assert_eq!(summary.outcomes.len(), 4);
        assert_eq!(backend.calls_to("/api/vacancy/3/apply"), 0);
        assert_eq!(backend.calls_to("/api/vacancy/4/apply"), 0);
        assert_eq!(backend.requests().len(), 2);
    }

    #[test]
    fn test_failed_count_never_underflows() {
        let summary = SubmissionSummary {
            attempted: 1,
            succeeded: 2,
            outcomes: Vec::new(),
        };
        assert_eq!(summary.failed(), 0);
    }

    #[tokio::test]
    async fn test_submit_board_sends_only_submittable() {
        let backend = MockBackend::new();
        backend.route(Method::Post, "/api/vacancy/2/apply", ApiResponse::new(200, "{}"));
        let board = SharedBoard::new();
        {
            let mut board = board.lock();
            board.replace(summaries(&["1", "2", "3"]));
            board.set_letter("2", "Hello").unwrap();
            board.set_letter("3", "Hi").unwrap();
            board.set_selected("3", false).unwrap();
        }

        let summary = submitter(&backend).submit_board(&board).await.unwrap();

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.outcomes[0].vacancy_id, "2");
    }
}

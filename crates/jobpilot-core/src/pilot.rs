//! Application facade.
//!
//! [`JobPilot`] wires one session, the backend API, the board and the
//! workers together, and exposes the flows a front end drives: sign in,
//! search, enrich, edit, submit.

use std::sync::{Arc, Mutex, PoisonError};

use jobpilot_session::{
    AuthState, HttpTransport, Location, SessionConfig, SessionManager, TokenStore, Transport,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use crate::api::BackendApi;
use crate::board::SharedBoard;
use crate::cache::ResponseCache;
use crate::config::{Config, DEFAULT_ENRICH_SPACING};
use crate::enrichment::{BatchReport, EnrichmentPipeline, EnrichmentReport};
use crate::model::{Area, Dictionaries, RUSSIA_AREA_ID, Resume, SearchFilters, flatten_country_areas};
use crate::submit::{ApplicationBatchSubmitter, SubmissionSummary};
use crate::Result;

/// Job search client.
pub struct JobPilot<T> {
    api: Arc<BackendApi<T>>,
    board: SharedBoard,
    enrichment: Arc<EnrichmentPipeline<T>>,
    submitter: ApplicationBatchSubmitter<T>,
    resume: Mutex<Option<Resume>>,
}

impl<T> std::fmt::Debug for JobPilot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPilot")
            .field("api", &self.api)
            .field("board", &self.board)
            .finish_non_exhaustive()
    }
}

impl JobPilot<HttpTransport> {
    /// Builds a client talking HTTP to the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured URL is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn TokenStore>,
        location: Arc<dyn Location>,
    ) -> Result<Self> {
        let transport = HttpTransport::new(&config.api_url)?;
        let session_config = SessionConfig::new(&config.client_id, &config.redirect_uri)?;
        let session = Arc::new(SessionManager::new(transport, store, location, session_config));
        let cache = ResponseCache::with_ttl(config.cache_ttl);
        Ok(Self::with_parts(session, cache, config.enrich_spacing))
    }
}

impl<T: Transport> JobPilot<T> {
    /// Builds a client over an existing session with default spacing and
    /// cache TTL.
    #[must_use]
    pub fn new(session: Arc<SessionManager<T>>) -> Self {
        Self::with_parts(session, ResponseCache::new(), DEFAULT_ENRICH_SPACING)
    }

    /// Builds a client from its parts.
    #[must_use]
    pub fn with_parts(
        session: Arc<SessionManager<T>>,
        cache: ResponseCache,
        spacing: std::time::Duration,
    ) -> Self {
        let api = Arc::new(BackendApi::new(session, cache));
        let board = SharedBoard::new();
        let enrichment = Arc::new(EnrichmentPipeline::new(
            Arc::clone(&api),
            board.clone(),
            spacing,
        ));
        Self {
            submitter: ApplicationBatchSubmitter::new(Arc::clone(&api)),
            api,
            board,
            enrichment,
            resume: Mutex::new(None),
        }
    }

    /// The shared session.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager<T>> {
        self.api.session()
    }

    /// The current result set.
    #[must_use]
    pub const fn board(&self) -> &SharedBoard {
        &self.board
    }

    /// The typed backend API.
    #[must_use]
    pub const fn api(&self) -> &Arc<BackendApi<T>> {
        &self.api
    }

    /// Provider URL that starts the login flow.
    #[must_use]
    pub fn login_url(&self) -> Url {
        self.session().login_url()
    }

    /// Restores or establishes the session, then loads the resume.
    ///
    /// # Errors
    ///
    /// Returns an error if an authorization code in the URL was rejected.
    pub async fn initialize(&self) -> Result<AuthState> {
        let state = self.session().initialize().await?;
        if state == AuthState::Authenticated {
            self.load_resume().await;
        }
        Ok(state)
    }

    /// Ends the session and forgets the resume.
    pub fn logout(&self) {
        self.session().logout();
        *self.resume.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Fetches and remembers the resume. Failures are logged.
    pub async fn load_resume(&self) -> Option<Resume> {
        match self.api.resume().await {
            Ok(resume) => {
                info!(resume = %resume.id, "Resume loaded");
                *self.resume.lock().unwrap_or_else(PoisonError::into_inner) = Some(resume.clone());
                Some(resume)
            }
            Err(e) => {
                warn!("Failed to load resume: {e}");
                None
            }
        }
    }

    /// The last loaded resume.
    #[must_use]
    pub fn resume(&self) -> Option<Resume> {
        self.resume
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Filter dictionaries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn dictionaries(&self) -> Result<Dictionaries> {
        self.api.dictionaries().await
    }

    /// Regions and cities of Russia as a flat list.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn russian_areas(&self) -> Result<Vec<Area>> {
        let tree = self.api.areas().await?;
        Ok(flatten_country_areas(&tree, RUSSIA_AREA_ID))
    }

    /// Runs a search and replaces the board with its results, all selected.
    /// Returns the number of vacancies now on the board; an id the backend
    /// repeats counts once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SearchFailed`] or the session's
    /// `Unauthorized` error; the board is unchanged on error.
    pub async fn search(&self, filters: &SearchFilters) -> Result<usize> {
        let items = self.api.search(filters).await?;
        let (generation, count) = {
            let mut board = self.board.lock();
            let generation = board.replace(items);
            (generation, board.len())
        };
        info!(generation, count, "Search complete");
        Ok(count)
    }

    /// Runs a search, then starts fetching details in the background.
    ///
    /// # Errors
    ///
    /// Same as [`JobPilot::search`].
    pub async fn search_and_enrich(
        &self,
        filters: &SearchFilters,
    ) -> Result<JoinHandle<Result<EnrichmentReport>>> {
        self.search(filters).await?;
        Ok(self.enrichment.spawn())
    }

    /// Fetches missing vacancy details.
    ///
    /// # Errors
    ///
    /// Returns the session's `Unauthorized` error if the session ended.
    pub async fn enrich(&self) -> Result<EnrichmentReport> {
        self.enrichment.run().await
    }

    /// Scores every unscored vacancy.
    ///
    /// # Errors
    ///
    /// Returns the session's `Unauthorized` error if the session ended.
    pub async fn analyze_all(&self) -> Result<BatchReport> {
        self.enrichment.analyze_all().await
    }

    /// Generates letters for every vacancy without one.
    ///
    /// # Errors
    ///
    /// Returns the session's `Unauthorized` error if the session ended.
    pub async fn generate_all(&self) -> Result<BatchReport> {
        self.enrichment.generate_all().await
    }

    /// Rescores one vacancy.
    ///
    /// # Errors
    ///
    /// Returns an error if the vacancy is unknown, already being scored, or
    /// the call fails.
    pub async fn analyze(&self, id: &str) -> Result<u8> {
        self.enrichment.analyze(id).await
    }

    /// Regenerates the letter of one vacancy.
    ///
    /// # Errors
    ///
    /// Returns an error if the vacancy is unknown, already getting a letter,
    /// or the call fails.
    pub async fn generate_letter(&self, id: &str) -> Result<String> {
        self.enrichment.generate_letter(id).await
    }

    /// Replaces the letter of one vacancy with user text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::VacancyNotFound`] if `id` is not on the board.
    pub fn edit_letter(&self, id: &str, letter: impl Into<String>) -> Result<()> {
        self.board.lock().set_letter(id, letter)
    }

    /// Flips the selection of one vacancy.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::VacancyNotFound`] if `id` is not on the board.
    pub fn toggle_selected(&self, id: &str) -> Result<bool> {
        self.board.lock().toggle_selected(id)
    }

    /// Selects everything, or clears the selection when everything is
    /// already selected. Returns the new state.
    pub fn toggle_all(&self) -> bool {
        let mut board = self.board.lock();
        let select = !board.all_selected();
        board.set_all_selected(select);
        select
    }

    /// Number of vacancies [`JobPilot::submit`] would send.
    #[must_use]
    pub fn submittable_count(&self) -> usize {
        self.board.lock().submittable_count()
    }

    /// Applies to every selected vacancy that has a letter.
    ///
    /// Returns `None` without any request when nothing qualifies.
    pub async fn submit(&self) -> Option<SubmissionSummary> {
        self.submitter.submit_board(&self.board).await
    }
}

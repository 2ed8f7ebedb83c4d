//! Session lifecycle and the authenticated request gate.
//!
//! ## Design
//!
//! [`SessionManager`] is the only path to the backend. Every request passes
//! through [`SessionManager::send`], which attaches the bearer token on the
//! way out and inspects the status on the way in. The first 401 from any
//! endpoint for the live token logs the user out and sends the page back
//! to the landing view; from then on authenticated requests are refused
//! locally until a new code exchange or a restored token.
//!
//! The manager is shared as an `Arc` handle by every component that talks
//! to the backend. There is exactly one live session per manager.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::location::{Location, auth_code_from_url, without_auth_code};
use crate::provider::Provider;
use crate::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore};
use crate::token::{ErrorResponse, REFRESH_TOKEN_LIFETIME_DAYS, Token, TokenResponse};
use crate::transport::{AUTHORIZATION, Access, ApiRequest, ApiResponse, Transport};

/// Path of the authorization code exchange endpoint.
const AUTH_CALLBACK_PATH: &str = "/api/auth/callback";

/// How many exchanged authorization codes are remembered for replay checks.
const REMEMBERED_CODES: usize = 16;

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// OAuth client identifier.
    pub client_id: String,
    /// Redirect URI registered with the provider.
    pub redirect_uri: Url,
    /// Unauthenticated landing view, visited after a forced logout.
    pub landing_url: Url,
    /// OAuth provider.
    pub provider: Provider,
}

impl SessionConfig {
    /// Creates a configuration for hh.ru with the landing view at the
    /// redirect URI.
    ///
    /// # Errors
    ///
    /// Returns an error if `redirect_uri` is not a valid URL.
    pub fn new(client_id: impl Into<String>, redirect_uri: impl AsRef<str>) -> Result<Self> {
        let redirect_uri = Url::parse(redirect_uri.as_ref())?;
        Ok(Self {
            client_id: client_id.into(),
            landing_url: redirect_uri.clone(),
            redirect_uri,
            provider: Provider::headhunter()?,
        })
    }

    /// Sets the landing URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid URL.
    pub fn with_landing_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.landing_url = Url::parse(url.as_ref())?;
        Ok(self)
    }

    /// Sets the OAuth provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }
}

/// Outcome of [`SessionManager::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No session; show the landing view.
    Anonymous,
    /// A bearer token is live.
    Authenticated,
}

/// Owns the bearer token and gates all backend traffic.
pub struct SessionManager<T> {
    transport: T,
    store: Arc<dyn TokenStore>,
    location: Arc<dyn Location>,
    config: SessionConfig,
    token: RwLock<Option<Token>>,
    exchanged_codes: Mutex<VecDeque<String>>,
}

impl<T> std::fmt::Debug for SessionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("client_id", &self.config.client_id)
            .field(
                "authenticated",
                &self
                    .token
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some(),
            )
            .finish_non_exhaustive()
    }
}

impl<T: Transport> SessionManager<T> {
    /// Creates an unauthenticated session manager.
    #[must_use]
    pub fn new(
        transport: T,
        store: Arc<dyn TokenStore>,
        location: Arc<dyn Location>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            store,
            location,
            config,
            token: RwLock::new(None),
            exchanged_codes: Mutex::new(VecDeque::with_capacity(REMEMBERED_CODES)),
        }
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true while a bearer token is live.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Returns a copy of the live token.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Provider URL that starts the login flow.
    #[must_use]
    pub fn login_url(&self) -> Url {
        self.config.provider.authorization_url(
            &self.config.client_id,
            self.config.redirect_uri.as_str(),
            None,
        )
    }

    /// Restores a persisted token without network I/O.
    ///
    /// Returns whether a session is now live. A missing or unreadable token
    /// leaves the session anonymous.
    pub fn restore(&self) -> bool {
        let access_token = match self.store.load(ACCESS_TOKEN_KEY) {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No persisted session token");
                return false;
            }
            Err(e) => {
                warn!("Failed to read persisted session token: {e}");
                return false;
            }
        };

        let refresh_token = self.store.load(REFRESH_TOKEN_KEY).unwrap_or_else(|e| {
            warn!("Failed to read persisted refresh token: {e}");
            None
        });

        let mut token = Token::new(access_token);
        token.refresh_token = refresh_token;
        self.set_token(Some(token));
        info!("Session restored from storage");
        true
    }

    /// Exchanges an authorization code for a session.
    ///
    /// Each code value is exchanged at most once; the most recent codes are
    /// remembered to refuse replays. The code is scrubbed from the visible
    /// URL right after the attempt, whatever its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] if the code was already used
    /// or the backend rejects it. The current session is left untouched.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        if !self.remember_code(code) {
            warn!("Authorization code replayed; refusing second exchange");
            self.clear_code_from_location();
            return Err(Error::AuthenticationFailed(
                "authorization code already used".into(),
            ));
        }

        let request = ApiRequest::post(AUTH_CALLBACK_PATH).query("code", code);
        let outcome = self.transport.execute(request).await;
        self.clear_code_from_location();

        let response = outcome.map_err(|e| Error::AuthenticationFailed(e.to_string()))?;
        if !response.is_success() {
            warn!(status = response.status, "Authorization code rejected");
            return Err(ErrorResponse::parse(&response.body).into_auth_error());
        }

        let token_response: TokenResponse = response
            .parse()
            .map_err(|e| Error::AuthenticationFailed(format!("invalid token response: {e}")))?;
        let token = Token::from_response(token_response);
        self.persist(&token);
        self.set_token(Some(token));
        info!("Session established from authorization code");
        Ok(())
    }

    /// Restores a persisted session, or exchanges the code found in the
    /// current URL when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] if a code was present and the
    /// exchange failed.
    pub async fn initialize(&self) -> Result<AuthState> {
        if self.restore() {
            return Ok(AuthState::Authenticated);
        }

        match auth_code_from_url(&self.location.current()) {
            Some(code) => {
                self.exchange_code(&code).await?;
                Ok(AuthState::Authenticated)
            }
            None => Ok(AuthState::Anonymous),
        }
    }

    /// Ends the session and clears persisted tokens. Safe to call repeatedly.
    pub fn logout(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to remove persisted {key}: {e}");
            }
        }
        if self.set_token(None).is_some() {
            info!("Session ended");
        }
    }

    /// Adds the bearer header when a session is live and returns the
    /// access token it carries.
    pub fn attach(&self, request: &mut ApiRequest) -> Option<String> {
        let token = self.token.read().unwrap_or_else(PoisonError::into_inner);
        let token = token.as_ref()?;
        request.set_header(AUTHORIZATION, token.bearer());
        Some(token.access_token.clone())
    }

    /// Tears the session down on a 401 and navigates to the landing view.
    ///
    /// `sent_with` is the access token the request carried. A 401 for a
    /// token that is no longer live leaves the current session alone.
    /// Returns true if the response was a 401.
    pub fn on_unauthorized(&self, response: &ApiResponse, sent_with: Option<&str>) -> bool {
        if !response.is_unauthorized() {
            return false;
        }
        let live = self.token().map(|t| t.access_token);
        if live.as_deref() != sent_with {
            debug!("401 for a replaced token; keeping the current session");
            return true;
        }
        warn!("Backend answered 401; ending session");
        self.logout();
        self.location.navigate(self.config.landing_url.clone());
        true
    }

    /// Sends a request through the session gate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if `access` requires a session and
    /// none is live (no I/O happens), or if the backend answers 401.
    /// Returns [`Error::Api`] for other non-success statuses.
    pub async fn send(&self, mut request: ApiRequest, access: Access) -> Result<ApiResponse> {
        if access == Access::Authenticated && !self.is_authenticated() {
            debug!(path = %request.path, "Refusing authenticated request without session");
            return Err(Error::Unauthorized);
        }

        let sent_with = self.attach(&mut request);
        let response = self.transport.execute(request).await?;

        if self.on_unauthorized(&response, sent_with.as_deref()) {
            return Err(Error::Unauthorized);
        }
        if !response.is_success() {
            let message = ErrorResponse::parse(&response.body)
                .message()
                .map_or_else(|| format!("status {}", response.status), str::to_string);
            return Err(Error::api(response.status, message));
        }
        Ok(response)
    }

    /// Sends a request and deserializes the JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`SessionManager::send`], plus JSON decoding errors.
    pub async fn send_json<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
        access: Access,
    ) -> Result<R> {
        self.send(request, access).await?.parse()
    }

    /// Records `code`; returns false if it was exchanged before.
    fn remember_code(&self, code: &str) -> bool {
        let mut codes = self
            .exchanged_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if codes.iter().any(|c| c == code) {
            return false;
        }
        if codes.len() == REMEMBERED_CODES {
            codes.pop_front();
        }
        codes.push_back(code.to_string());
        true
    }

    fn set_token(&self, token: Option<Token>) -> Option<Token> {
        std::mem::replace(
            &mut *self.token.write().unwrap_or_else(PoisonError::into_inner),
            token,
        )
    }

    fn persist(&self, token: &Token) {
        let Some(expires_at) = token.expires_at else {
            return;
        };
        if let Err(e) = self
            .store
            .save(ACCESS_TOKEN_KEY, &token.access_token, expires_at)
        {
            warn!("Failed to persist session token: {e}");
        }
        if let Some(refresh) = &token.refresh_token {
            let refresh_expires =
                chrono::Utc::now() + chrono::Duration::days(REFRESH_TOKEN_LIFETIME_DAYS);
            if let Err(e) = self.store.save(REFRESH_TOKEN_KEY, refresh, refresh_expires) {
                warn!("Failed to persist refresh token: {e}");
            }
        }
    }

    fn clear_code_from_location(&self) {
        let current = self.location.current();
        if auth_code_from_url(&current).is_some() {
            self.location.replace(without_auth_code(&current));
        }
    }
}

//! # jobpilot-session
//!
//! Bearer session management for the jobpilot backend.
//!
//! ## Features
//!
//! - **Code exchange**: one-shot exchange of an hh.ru authorization code,
//!   scrubbed from the URL so a reload cannot replay it
//! - **Persistence**: access token (24h) and refresh token (30 days) in a
//!   [`TokenStore`], in memory or in the OS keyring
//! - **Request gate**: every call goes through [`SessionManager::send`], which
//!   attaches the bearer header and ends the session on the first 401
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use jobpilot_session::{
//!     Access, ApiRequest, HttpTransport, KeyringTokenStore, MemoryLocation, SessionConfig,
//!     SessionManager,
//! };
//!
//! let transport = HttpTransport::new("http://localhost:8000")?;
//! let location = Arc::new(MemoryLocation::new("http://localhost:3000/?code=abc".parse()?));
//! let config = SessionConfig::new("client-id", "http://localhost:3000/")?;
//! let session = SessionManager::new(
//!     transport,
//!     Arc::new(KeyringTokenStore::default()),
//!     location,
//!     config,
//! );
//!
//! // Restore a saved token, or exchange the code from the redirect
//! session.initialize().await?;
//!
//! let resume = session
//!     .send(ApiRequest::get("/api/resume"), Access::Authenticated)
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod location;
mod manager;
pub mod provider;
pub mod store;
pub mod token;
pub mod transport;

pub use error::{Error, Result};
pub use location::{Location, MemoryLocation};
pub use manager::{AuthState, SessionConfig, SessionManager};
pub use provider::Provider;
pub use store::{KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use token::Token;
pub use transport::{Access, ApiRequest, ApiResponse, HttpTransport, Method, Transport};

//! Persistence for session tokens.
//!
//! A [`TokenStore`] plays the role a cookie jar plays in a browser: named
//! values with an absolute expiry, read back only while unexpired.

mod os_keyring;

pub use os_keyring::KeyringTokenStore;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Store key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "jwt_token";

/// Store key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Named, expiring string storage.
pub trait TokenStore: Send + Sync {
    /// Returns the value under `key` if present and not expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key` until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

type Entries = HashMap<String, (String, DateTime<Utc>)>;

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<Entries>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding an access token valid until `expires_at`.
    #[must_use]
    pub fn with_access_token(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(ACCESS_TOKEN_KEY.to_string(), (token.into(), expires_at));
        }
        store
    }

    fn entries(&self) -> Result<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("token store lock poisoned".into()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries()?;
        match entries.get(key) {
            Some((_, expires_at)) if Utc::now() >= *expires_at => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.entries()?
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

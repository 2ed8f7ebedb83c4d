//! Token storage in the system keyring.
//!
//! Uses the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TokenStore;
use crate::error::Result;

/// Default service name for keyring entries.
const SERVICE_NAME: &str = "jobpilot";

/// Value plus expiry, serialized as JSON into the keyring secret.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSecret {
    value: String,
    expires_at: DateTime<Utc>,
}

/// [`TokenStore`] backed by the OS keyring.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service: String,
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl KeyringTokenStore {
    /// Creates a store using `service` as the keyring service name.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let entry = self.entry(key)?;
        let secret_json = match entry.get_password() {
            Ok(json) => json,
            Err(keyring::Error::NoEntry) => {
                debug!("No {key} found in keyring");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let secret: StoredSecret = serde_json::from_str(&secret_json)?;
        if Utc::now() >= secret.expires_at {
            debug!("Keyring {key} expired at {}", secret.expires_at);
            self.remove(key)?;
            return Ok(None);
        }
        Ok(Some(secret.value))
    }

    fn save(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let secret = StoredSecret {
            value: value.to_string(),
            expires_at,
        };
        self.entry(key)?
            .set_password(&serde_json::to_string(&secret)?)?;
        debug!("Stored {key} in keyring until {expires_at}");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!("Deleted {key} from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!("Failed to delete {key} from keyring: {e}");
                Err(e.into())
            }
        }
    }
}

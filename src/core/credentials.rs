//! Secure credential storage
//!
//! The access token lives in the system keyring (macOS Keychain, Linux Secret
//! Service) behind the [`SecretStore`] trait, with an in-memory cache to
//! minimize keychain prompts. [`MemoryStore`] keeps everything in process for
//! tests and `--ephemeral` runs.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use keyring::Entry;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{HubviewError, Result};

/// Keyring service name
pub const SERVICE_NAME: &str = "hubview";

/// Keyring entry holding the GitHub access token
pub const GITHUB_TOKEN_KEY: &str = "github_access_token";

/// Key/value secret storage
#[cfg_attr(test, mockall::automock)]
pub trait SecretStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value under `key`, `None` when absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`; removing an absent key succeeds
    fn delete(&self, key: &str) -> Result<()>;
}

/// System keyring backed store
#[derive(Debug)]
pub struct KeyringStore {
    service: String,
    // Per key:
    //   - absent = not yet fetched from keyring
    //   - None = fetched, but no credential exists
    //   - Some(value) = fetched and cached
    cache: RwLock<HashMap<String, Option<String>>>,
}

impl KeyringStore {
    /// Store under the default `hubview` service
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Store under a custom keyring service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Ok(Entry::new(&self.service, key)?)
    }

    /// Update the cache after a keychain delete
    ///
    /// A failed delete leaves the keychain value in place, so the cache keeps it.
    fn settle_delete(
        &self,
        key: &str,
        outcome: std::result::Result<(), keyring::Error>,
    ) -> Result<()> {
        match outcome {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                self.remember(key, None);
                Ok(())
            }
            Err(e) => Err(HubviewError::Credential(e.to_string())),
        }
    }

    fn remember(&self, key: &str, value: Option<String>) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?.set_password(value)?;
        self.remember(key, Some(value.to_string()));
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(cached.clone());
        }

        let value = match self.entry(key)?.get_password() {
            Ok(password) => Some(password),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                return Err(HubviewError::Credential(format!(
                    "Cannot access system keychain. Make sure your keyring is unlocked. ({})",
                    e
                )))
            }
        };

        self.remember(key, value.clone());
        Ok(value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let outcome = self.entry(key)?.delete_credential();
        self.settle_delete(key, outcome)
    }
}

/// In-process store; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemoryStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

impl<S: SecretStore + ?Sized> SecretStore for Box<S> {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        (**self).save(key, value)
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

/// Durable storage for the single GitHub access token
#[derive(Debug)]
pub struct TokenStore<S> {
    store: S,
}

impl<S: SecretStore> TokenStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist the token, replacing any previous one
    pub fn save(&self, token: &SecretString) -> Result<()> {
        self.store.save(GITHUB_TOKEN_KEY, token.expose_secret())
    }

    /// Load the persisted token
    ///
    /// An empty stored value counts as absent.
    pub fn load(&self) -> Result<Option<SecretString>> {
        Ok(self
            .store
            .read(GITHUB_TOKEN_KEY)?
            .filter(|token| !token.is_empty())
            .map(SecretString::from))
    }

    /// Remove the persisted token; succeeds when none is stored
    pub fn delete(&self) -> Result<()> {
        self.store.delete(GITHUB_TOKEN_KEY)
    }

    /// Get a masked version of a token for display (shows first 4 and last 4 chars)
    pub fn mask_token(token: &SecretString) -> String {
        mask_secret(token.expose_secret())
    }
}

/// Mask a secret for display: first 4 and last 4 chars, all `*` when short
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

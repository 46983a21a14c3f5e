//! GitHub token storage
//!
//! A personal access token can be kept in the platform keyring. The engine
//! itself never reads the keyring: the resolved token is handed to
//! [`GitHubClient::new`](crate::services::github::GitHubClient::new).

use keyring::Entry;

use crate::config::Config;
use crate::error::{RepoPushError, Result};

/// Service name for keyring storage
const KEYRING_SERVICE: &str = "repopush-github";
const KEYRING_USER: &str = "github-token";

/// Where a resolved token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Argument,
    Environment,
    Keyring,
}

/// Keyring-backed token store
pub struct TokenStore {
    service: String,
    user: String,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE, KEYRING_USER)
    }
}

impl TokenStore {
    pub fn new(service: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            user: user.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.user).map_err(|e| {
            RepoPushError::Credentials(format!("Failed to create keyring entry: {}", e))
        })
    }

    pub fn store(&self, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(RepoPushError::InvalidInput("Token must not be empty".to_string()));
        }
        self.entry()?
            .set_password(token.trim())
            .map_err(|e| RepoPushError::Credentials(format!("Failed to store token: {}", e)))
    }

    /// Stored token, `None` if nothing has been stored
    pub fn get(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(RepoPushError::Credentials(format!(
                "Failed to get token: {}",
                e
            ))),
        }
    }

    pub fn delete(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
            Err(e) => Err(RepoPushError::Credentials(format!(
                "Failed to delete token: {}",
                e
            ))),
        }
    }
}

/// Pick a token: explicit argument, then environment, then keyring
pub fn resolve_token(
    explicit: Option<&str>,
    config: &Config,
    store: &TokenStore,
) -> Result<(String, TokenSource)> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok((token.to_string(), TokenSource::Argument));
    }
    if let Some(token) = config.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return Ok((token.to_string(), TokenSource::Environment));
    }
    match store.get()? {
        Some(token) => Ok((token, TokenSource::Keyring)),
        None => Err(RepoPushError::AuthenticationRequired),
    }
}

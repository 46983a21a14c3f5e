//! Credential and account flows

use crate::config::Config;
use crate::error::Result;
use crate::models::AuthenticatedUser;
use crate::services::{resolve_token, GitHubApi, GitHubClient, RepositoryCatalog, TokenSource, TokenStore};

/// Build a client from the first available token
pub fn connect(
    explicit_token: Option<&str>,
    config: &Config,
    store: &TokenStore,
) -> Result<(GitHubClient, TokenSource)> {
    let (token, source) = resolve_token(explicit_token, config, store)?;
    tracing::debug!(?source, "using GitHub token");
    Ok((GitHubClient::new(token, config)?, source))
}

/// Validate `token` against the API and keep it in the keyring
pub async fn login(token: &str, config: &Config, store: &TokenStore) -> Result<AuthenticatedUser> {
    let client = GitHubClient::new(token.trim(), config)?;
    let user = validate(&client, config).await?;
    store.store(token)?;
    tracing::info!(login = %user.login, "stored GitHub token");
    Ok(user)
}

/// The token's user, warning about missing scopes
pub async fn validate(api: &dyn GitHubApi, config: &Config) -> Result<AuthenticatedUser> {
    RepositoryCatalog::new(api, (&config.retry).into())
        .validate_token()
        .await
}

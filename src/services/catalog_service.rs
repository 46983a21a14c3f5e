//! Account and repository catalog operations

use std::future::Future;

use crate::error::{ApiError, ApiErrorKind, RepoPushError, Result};
use crate::models::{AuthenticatedUser, NewRepository, Repository};
use crate::services::github::{ApiResult, GitHubApi, PAGE_SIZE};
use crate::services::retry::RetryPolicy;

/// Upper bound on pages fetched by one listing
const MAX_PAGES: u32 = 100;

/// Maximum repository name length accepted by GitHub
pub const MAX_REPOSITORY_NAME_LEN: usize = 100;

pub struct RepositoryCatalog<'a> {
    api: &'a dyn GitHubApi,
    retry: RetryPolicy,
}

impl<'a> RepositoryCatalog<'a> {
    pub fn new(api: &'a dyn GitHubApi, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// The token's user and scopes
    pub async fn validate_token(&self) -> Result<AuthenticatedUser> {
        let user = self.api.authenticated_user().await?;
        let missing = user.missing_scopes();
        if !missing.is_empty() {
            tracing::warn!(login = %user.login, ?missing, "token is missing recommended scopes");
        }
        Ok(user)
    }

    /// Every repository of the user, most recently updated first.
    ///
    /// Each page is retried on transient failures.
    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        let api = self.api;
        let retry = &self.retry;
        let repos = collect_pages(move |page| {
            retry.run("Failed to fetch repositories", move || api.list_repositories(page))
        })
        .await?;
        tracing::debug!(count = repos.len(), "listed repositories");
        Ok(repos)
    }

    /// Look a repository up by `owner/name` among the user's repositories
    pub async fn find_repository(&self, full_name: &str) -> Result<Repository> {
        self.list_repositories()
            .await?
            .into_iter()
            .find(|r| r.full_name.eq_ignore_ascii_case(full_name))
            .ok_or_else(|| {
                RepoPushError::Api(ApiError::new(
                    ApiErrorKind::NotFound,
                    format!("Repository '{}' not found or not accessible", full_name),
                    None,
                ))
            })
    }

    /// Every branch name of a repository
    pub async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let api = self.api;
        let branches = collect_pages(move |page| api.list_branches(owner, repo, page)).await?;
        Ok(branches)
    }

    /// Create a repository under the authenticated user, initialized with a
    /// first commit so it has a default branch to push onto
    pub async fn create_repository(
        &self,
        name: &str,
        description: Option<&str>,
        private: bool,
    ) -> Result<Repository> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepoPushError::InvalidInput(
                "Repository name is required".to_string(),
            ));
        }
        if name.chars().count() > MAX_REPOSITORY_NAME_LEN {
            return Err(RepoPushError::InvalidInput(format!(
                "Repository name must be {} characters or less",
                MAX_REPOSITORY_NAME_LEN
            )));
        }

        let input = NewRepository::new(
            name,
            description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            private,
        );

        let repository = self
            .api
            .create_repository(&input)
            .await
            .map_err(explain_create_error)?;
        tracing::info!(full_name = %repository.full_name, private, "created repository");
        Ok(repository)
    }
}

/// Replace terse API messages with actionable ones where the status alone
/// says what went wrong
fn explain_create_error(mut error: ApiError) -> ApiError {
    match error.kind {
        ApiErrorKind::Authentication => {
            error.message = "Authentication failed. Please check your token permissions.".to_string();
        }
        ApiErrorKind::Authorization => {
            error.message =
                "Insufficient permissions. Make sure your token has repo scope.".to_string();
        }
        ApiErrorKind::Validation if error.message == "Failed to create repository" => {
            error.message = "Repository name already exists or is invalid".to_string();
        }
        _ => {}
    }
    error
}

/// Fetch pages from 1 until a page comes back short
async fn collect_pages<T, F, Fut>(mut fetch: F) -> ApiResult<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ApiResult<Vec<T>>>,
{
    let mut items = Vec::new();
    for page in 1..=MAX_PAGES {
        let batch = fetch(page).await?;
        let done = batch.len() < PAGE_SIZE as usize;
        items.extend(batch);
        if done {
            break;
        }
    }
    Ok(items)
}

//! GitHub REST API access
//!
//! The engine talks to GitHub only through the [`GitHubApi`] trait so the
//! diff and commit services can run against any implementation of the
//! git data endpoints. [`GitHubClient`] is the HTTP implementation.

mod client;

pub use client::GitHubClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{AuthenticatedUser, CreatedCommit, NewRepository, Repository, TreeChange};

/// Result of a single API call
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Page size for every paginated listing
pub const PAGE_SIZE: u32 = 100;

/// A file object in a recursive tree listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTreeEntry {
    pub path: String,
    pub sha: String,
}

/// Blob entries of a tree, listed recursively
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTree {
    pub entries: Vec<RemoteTreeEntry>,
    /// GitHub stopped listing before reaching every entry
    pub truncated: bool,
}

/// Operations the engine needs from a GitHub-compatible forge
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// The user the credential belongs to, with its granted scopes
    async fn authenticated_user(&self) -> ApiResult<AuthenticatedUser>;

    /// One page of the user's repositories, most recently updated first
    async fn list_repositories(&self, page: u32) -> ApiResult<Vec<Repository>>;

    /// One page of branch names
    async fn list_branches(&self, owner: &str, repo: &str, page: u32) -> ApiResult<Vec<String>>;

    /// Head commit of a branch, `None` when the branch does not exist.
    /// A missing repository is an error, not an absent branch.
    async fn branch_head(&self, owner: &str, repo: &str, branch: &str)
        -> ApiResult<Option<String>>;

    /// Root tree of a commit
    async fn commit_tree(&self, owner: &str, repo: &str, commit_sha: &str) -> ApiResult<String>;

    /// Every blob reachable from a tree (or commit), directories excluded
    async fn tree_recursive(&self, owner: &str, repo: &str, tree_sha: &str)
        -> ApiResult<RemoteTree>;

    /// Upload base64-encoded bytes as a blob, returning its sha
    async fn create_blob(&self, owner: &str, repo: &str, base64_content: &str)
        -> ApiResult<String>;

    /// Create a tree from `changes`, layered on `base_tree` when given
    async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        changes: &[TreeChange],
        base_tree: Option<&str>,
    ) -> ApiResult<String>;

    async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        message: &str,
        tree_sha: &str,
        parents: &[String],
    ) -> ApiResult<CreatedCommit>;

    /// Move `refs/heads/<branch>` to `sha`, only as a fast-forward
    async fn update_branch(&self, owner: &str, repo: &str, branch: &str, sha: &str)
        -> ApiResult<()>;

    /// Create `refs/heads/<branch>` pointing at `sha`
    async fn create_branch(&self, owner: &str, repo: &str, branch: &str, sha: &str)
        -> ApiResult<()>;

    async fn create_repository(&self, input: &NewRepository) -> ApiResult<Repository>;
}

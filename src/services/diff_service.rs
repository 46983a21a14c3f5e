//! Repository diff engine
//!
//! Classifies candidate files against the recursive tree of a branch by
//! comparing locally computed blob digests with the shas in the listing.
//! Comparison is fail-open: when the branch cannot be read, every
//! candidate is reported as new so an upload can still go ahead.

use std::collections::{HashMap, HashSet};

use crate::error::{ApiError, ApiErrorKind};
use crate::models::{latest_entries, DiffOutcome, FileComparison, FileEntry, Repository};
use crate::services::github::{ApiResult, GitHubApi, RemoteTree};

pub struct DiffEngine<'a> {
    api: &'a dyn GitHubApi,
}

impl<'a> DiffEngine<'a> {
    pub fn new(api: &'a dyn GitHubApi) -> Self {
        Self { api }
    }

    /// Compare `candidates` with the current tree of `branch`.
    ///
    /// Only a missing branch yields [`DiffOutcome::NewBranch`]; a missing
    /// repository is reported as [`DiffOutcome::Unavailable`].
    pub async fn compare_files(
        &self,
        repository: &Repository,
        branch: &str,
        candidates: &[FileEntry],
    ) -> DiffOutcome {
        let owner = repository.owner_login();
        let repo = repository.name.as_str();

        match self.fetch_remote_tree(owner, repo, branch).await {
            Ok(Some(tree)) => {
                let comparison = classify(candidates, &tree);
                tracing::info!(%owner, %repo, %branch, "compared files: {}", comparison.summary());
                DiffOutcome::Diffed(comparison)
            }
            Ok(None) => {
                tracing::info!(%owner, %repo, %branch, "branch does not exist, all files are new");
                DiffOutcome::NewBranch(FileComparison::all_new(candidates))
            }
            Err(cause) => {
                tracing::warn!(
                    %owner,
                    %repo,
                    %branch,
                    kind = ?cause.kind,
                    "comparison unavailable, treating all files as new: {}",
                    cause
                );
                DiffOutcome::Unavailable {
                    comparison: FileComparison::all_new(candidates),
                    cause,
                }
            }
        }
    }

    /// Blob listing of the branch head, `None` when the branch is absent
    async fn fetch_remote_tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> ApiResult<Option<RemoteTree>> {
        let head = match self.api.branch_head(owner, repo, branch).await? {
            Some(sha) => sha,
            None => return Ok(None),
        };
        tracing::debug!(%owner, %repo, %branch, %head, "fetching tree");

        let tree = self.api.tree_recursive(owner, repo, &head).await?;
        if tree.truncated {
            // A partial listing would misreport unlisted paths as new and
            // miss deletions entirely.
            return Err(ApiError::new(
                ApiErrorKind::Unexpected,
                format!("Tree listing for {} was truncated by GitHub", branch),
                None,
            ));
        }
        Ok(Some(tree))
    }
}

/// Partition `candidates` against a remote blob listing.
///
/// Directory entries are skipped. When a path appears more than once only
/// its last entry is classified.
pub fn classify(candidates: &[FileEntry], remote: &RemoteTree) -> FileComparison {
    let remote_shas: HashMap<&str, &str> = remote
        .entries
        .iter()
        .map(|e| (e.path.as_str(), e.sha.as_str()))
        .collect();

    let latest = latest_entries(candidates);
    let mut comparison = FileComparison::default();

    for &file in &latest {
        match remote_shas.get(file.path.as_str()) {
            None => comparison.new_files.push(file.clone()),
            Some(remote_sha) => {
                if file.blob_sha().as_deref() == Some(*remote_sha) {
                    comparison.unchanged_files.push(file.clone());
                } else {
                    comparison.modified_files.push(file.clone());
                }
            }
        }
    }

    let local_paths: HashSet<&str> = latest.iter().map(|f| f.path.as_str()).collect();
    comparison.deleted_files = remote
        .entries
        .iter()
        .filter(|e| !local_paths.contains(e.path.as_str()))
        .map(|e| FileEntry::path_only(e.path.clone()))
        .collect();

    comparison
}

//! Commit construction through the git data API
//!
//! A commit is built by creating objects and then repointing the branch:
//!
//! 1. resolve the branch head (or the default branch head for a new branch)
//! 2. read the parent commit's root tree
//! 3. turn writes and deletes into tree entries
//! 4. create the tree, layered on the parent tree unless clearing
//! 5. create the commit with the old head as its only parent
//! 6. fast-forward the branch (or create it) to the new commit
//!
//! Nothing a reader can observe changes before step 6, and step 6 is a
//! single ref update, so a failure at any step leaves the branch where it
//! was. Steps run strictly in order and none of them is retried.

use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{ApiError, ApiErrorKind, RepoPushError, Result};
use crate::models::{
    latest_entries, CommitInfo, CommitPlan, CommitResult, FileContent, FileEntry, Repository,
    TreeChange,
};
use crate::services::github::GitHubApi;
use crate::services::progress::{ProgressCallback, ProgressReporter, UploadStage};

fn failed(operation: &'static str) -> impl FnOnce(ApiError) -> RepoPushError {
    move |source| RepoPushError::UploadFailed { operation, source }
}

pub struct CommitConstructor<'a> {
    api: &'a dyn GitHubApi,
}

impl<'a> CommitConstructor<'a> {
    pub fn new(api: &'a dyn GitHubApi) -> Self {
        Self { api }
    }

    /// Commit `plan` to `info.branch`
    pub async fn apply_plan(
        &self,
        repository: &Repository,
        plan: &CommitPlan,
        info: &CommitInfo,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<CommitResult> {
        self.apply(repository, &plan.writes, &plan.deletes, info, on_progress)
            .await
    }

    /// Write `writes`, remove `deletes` and move `info.branch` to the
    /// resulting commit
    pub async fn apply(
        &self,
        repository: &Repository,
        writes: &[FileEntry],
        deletes: &[FileEntry],
        info: &CommitInfo,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<CommitResult> {
        info.validate()?;
        CommitPlan::validate_sets(writes, deletes, info)?;

        let owner = repository.owner_login();
        let repo = repository.name.as_str();
        let branch = info.branch.as_str();
        let mut progress = ProgressReporter::new(on_progress);

        tracing::info!(
            %owner,
            %repo,
            %branch,
            writes = writes.len(),
            deletes = deletes.len(),
            clear_existing = info.clear_existing,
            "starting commit"
        );

        let (head_sha, branch_exists) = self.resolve_head(repository, branch).await?;
        progress.complete(UploadStage::ResolveHead);

        let base_tree = self
            .api
            .commit_tree(owner, repo, &head_sha)
            .await
            .map_err(failed("Failed to fetch parent commit"))?;
        progress.complete(UploadStage::FetchParent);

        let changes = self
            .build_changes(owner, repo, writes, deletes, info.clear_existing)
            .await?;
        progress.complete(UploadStage::BuildTree);

        let base = (!info.clear_existing).then_some(base_tree.as_str());
        let tree_sha = self
            .api
            .create_tree(owner, repo, &changes, base)
            .await
            .map_err(failed("Failed to create tree"))?;
        progress.complete(UploadStage::CreateTree);

        let parents = vec![head_sha.clone()];
        let commit = self
            .api
            .create_commit(owner, repo, &info.message, &tree_sha, &parents)
            .await
            .map_err(failed("Failed to create commit"))?;
        progress.complete(UploadStage::CreateCommit);

        if branch_exists {
            self.api
                .update_branch(owner, repo, branch, &commit.sha)
                .await
                .map_err(failed("Failed to update branch reference"))?;
        } else {
            self.api
                .create_branch(owner, repo, branch, &commit.sha)
                .await
                .map_err(failed("Failed to create branch reference"))?;
        }
        progress.complete(UploadStage::UpdateRef);

        tracing::info!(%owner, %repo, %branch, commit = %commit.sha, "branch updated");

        Ok(CommitResult {
            commit_sha: commit.sha,
            commit_url: commit.html_url,
            tree_sha,
            parent_sha: head_sha,
            branch: branch.to_string(),
            created_branch: !branch_exists,
        })
    }

    /// Head of `branch`, or of the default branch when `branch` is absent.
    /// The flag is false when the branch still has to be created.
    async fn resolve_head(&self, repository: &Repository, branch: &str) -> Result<(String, bool)> {
        let owner = repository.owner_login();
        let repo = repository.name.as_str();

        let head = self
            .api
            .branch_head(owner, repo, branch)
            .await
            .map_err(failed("Failed to resolve branch"))?;
        if let Some(sha) = head {
            return Ok((sha, true));
        }

        let default_branch = repository.default_branch.as_str();
        tracing::info!(%branch, %default_branch, "branch not found, starting from default branch");

        let default_head = self
            .api
            .branch_head(owner, repo, default_branch)
            .await
            .map_err(failed("Failed to resolve default branch"))?;
        match default_head {
            Some(sha) => Ok((sha, false)),
            None => Err(RepoPushError::UploadFailed {
                operation: "Failed to resolve default branch",
                source: ApiError::new(
                    ApiErrorKind::NotFound,
                    format!("Branch '{}' does not exist", default_branch),
                    Some(404),
                ),
            }),
        }
    }

    /// Tree entries for the commit.
    ///
    /// Binary files are uploaded as base64 blobs first because tree entries
    /// only accept UTF-8 content inline. A path written twice keeps its
    /// last entry, and a path that is both written and deleted is written. Deletes are dropped when clearing, since a tree
    /// without a base has nothing to remove.
    async fn build_changes(
        &self,
        owner: &str,
        repo: &str,
        writes: &[FileEntry],
        deletes: &[FileEntry],
        clear_existing: bool,
    ) -> Result<Vec<TreeChange>> {
        let mut changes = Vec::with_capacity(writes.len() + deletes.len());
        let mut written: HashSet<&str> = HashSet::new();

        for file in latest_entries(writes) {
            let change = match &file.content {
                Some(FileContent::Text(text)) => TreeChange::Inline {
                    path: file.path.clone(),
                    content: text.clone(),
                },
                Some(FileContent::Binary(bytes)) => {
                    let sha = self
                        .api
                        .create_blob(owner, repo, &STANDARD.encode(bytes))
                        .await
                        .map_err(failed("Failed to create blob"))?;
                    tracing::debug!(path = %file.path, %sha, size = bytes.len(), "uploaded binary blob");
                    TreeChange::Blob {
                        path: file.path.clone(),
                        sha,
                    }
                }
                None => {
                    return Err(RepoPushError::InvalidInput(format!(
                        "File '{}' has no content to write",
                        file.path
                    )))
                }
            };
            written.insert(file.path.as_str());
            changes.push(change);
        }

        if !clear_existing {
            changes.extend(
                deletes
                    .iter()
                    .filter(|f| !f.is_directory && !written.contains(f.path.as_str()))
                    .map(|f| TreeChange::Delete {
                        path: f.path.clone(),
                    }),
            );
        }

        Ok(changes)
    }
}

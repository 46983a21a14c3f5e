//! Archive-to-branch upload flow
//!
//! Extract → compare → plan → commit, with the caller deciding how the
//! comparison turns into writes and deletes.

use serde::Serialize;

use crate::error::Result;
use crate::models::{CommitInfo, CommitPlan, CommitResult, DiffOutcome, FileEntry, Repository};
use crate::services::{CommitConstructor, DiffEngine, GitHubApi, ProgressCallback};

/// How a comparison becomes a commit
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Target branch; the repository's default branch when unset
    pub branch: Option<String>,
    pub message: Option<String>,
    /// Replace the branch contents with exactly the candidate files
    pub clear_existing: bool,
    /// Also remove remote files that are missing locally
    pub delete_missing: bool,
    /// Compare only, never write
    pub dry_run: bool,
}

/// What a push did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    pub branch: String,
    /// The comparison was confirmed against the remote tree
    pub comparison_confirmed: bool,
    pub plan: CommitPlan,
    /// `None` for dry runs and when there was nothing to commit
    pub commit: Option<CommitResult>,
}

/// Default commit message for an upload named `label`
pub fn default_message(label: &str) -> String {
    format!("Upload project: {}", label)
}

/// Decide which files to write and delete for `outcome`.
///
/// Clearing writes every candidate, unchanged ones included, because the
/// new tree inherits nothing.
pub fn plan_from_outcome(
    outcome: &DiffOutcome,
    candidates: &[FileEntry],
    options: &PushOptions,
) -> CommitPlan {
    if options.clear_existing {
        return CommitPlan::new(
            candidates.iter().filter(|f| !f.is_directory).cloned().collect(),
            Vec::new(),
        );
    }
    let comparison = outcome.comparison();
    CommitPlan::from_comparison(comparison, options.delete_missing && outcome.is_confirmed())
}

/// Compare `candidates` with the target branch and commit the differences
pub async fn push_files(
    api: &dyn GitHubApi,
    repository: &Repository,
    candidates: &[FileEntry],
    label: &str,
    options: &PushOptions,
    on_progress: Option<ProgressCallback<'_>>,
) -> Result<PushReport> {
    let branch = options
        .branch
        .clone()
        .unwrap_or_else(|| repository.default_branch.clone());

    let outcome = DiffEngine::new(api)
        .compare_files(repository, &branch, candidates)
        .await;
    let plan = plan_from_outcome(&outcome, candidates, options);

    let mut report = PushReport {
        branch: branch.clone(),
        comparison_confirmed: outcome.is_confirmed(),
        plan,
        commit: None,
    };

    if options.dry_run {
        return Ok(report);
    }
    if report.plan.file_writes().next().is_none() && report.plan.deletes.is_empty() {
        tracing::info!(%branch, "nothing to commit");
        return Ok(report);
    }

    let message = options
        .message
        .clone()
        .unwrap_or_else(|| default_message(label));
    let info = CommitInfo::new(message, branch).clearing_existing(options.clear_existing);

    let result = CommitConstructor::new(api)
        .apply_plan(repository, &report.plan, &info, on_progress)
        .await?;
    report.commit = Some(result);
    Ok(report)
}

//! Comparison models

use serde::{Deserialize, Serialize};

use super::{latest_entries, FileEntry};
use crate::error::ApiError;

/// How a candidate file relates to the remote branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    New,
    Modified,
    Unchanged,
    Deleted,
}

/// Candidate files partitioned against a branch's tree.
///
/// `new_files`, `modified_files` and `unchanged_files` together hold every
/// non-directory candidate exactly once. `deleted_files` holds remote paths
/// with no candidate, as path-only entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileComparison {
    pub new_files: Vec<FileEntry>,
    pub modified_files: Vec<FileEntry>,
    pub unchanged_files: Vec<FileEntry>,
    pub deleted_files: Vec<FileEntry>,
}

impl FileComparison {
    /// Every non-directory candidate classified as new, duplicate paths
    /// collapsed to their last entry
    pub fn all_new(candidates: &[FileEntry]) -> Self {
        Self {
            new_files: latest_entries(candidates).into_iter().cloned().collect(),
            ..Self::default()
        }
    }

    /// True when nothing would be written or deleted
    pub fn has_no_changes(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Every classified path with its kind, in list order
    pub fn entries(&self) -> impl Iterator<Item = (ChangeKind, &FileEntry)> {
        self.new_files
            .iter()
            .map(|f| (ChangeKind::New, f))
            .chain(self.modified_files.iter().map(|f| (ChangeKind::Modified, f)))
            .chain(self.unchanged_files.iter().map(|f| (ChangeKind::Unchanged, f)))
            .chain(self.deleted_files.iter().map(|f| (ChangeKind::Deleted, f)))
    }

    pub fn summary(&self) -> ComparisonSummary {
        ComparisonSummary {
            new: self.new_files.len(),
            modified: self.modified_files.len(),
            unchanged: self.unchanged_files.len(),
            deleted: self.deleted_files.len(),
        }
    }
}

/// File counts per category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub new: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl std::fmt::Display for ComparisonSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} new, {} modified, {} unchanged, {} deleted",
            self.new, self.modified, self.unchanged, self.deleted
        )
    }
}

/// Result of comparing candidates against a branch.
///
/// A comparison never fails. When the remote side cannot be read the
/// outcome is [`DiffOutcome::Unavailable`], whose comparison treats every
/// candidate as new so an upload can still proceed.
#[derive(Debug, Clone)]
pub enum DiffOutcome {
    /// The branch was read and every candidate classified
    Diffed(FileComparison),
    /// The branch does not exist yet; every candidate is new
    NewBranch(FileComparison),
    /// The branch could not be read
    Unavailable {
        comparison: FileComparison,
        cause: ApiError,
    },
}

impl DiffOutcome {
    pub fn comparison(&self) -> &FileComparison {
        match self {
            DiffOutcome::Diffed(c) | DiffOutcome::NewBranch(c) => c,
            DiffOutcome::Unavailable { comparison, .. } => comparison,
        }
    }

    /// Whether the classification reflects the remote tree
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, DiffOutcome::Unavailable { .. })
    }
}

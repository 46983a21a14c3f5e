//! Commit construction models

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

use super::{FileComparison, FileEntry};
use crate::error::{RepoPushError, Result};

/// Git file mode for a regular, non-executable file
pub const REGULAR_FILE_MODE: &str = "100644";

/// Commit metadata supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub message: String,
    pub branch: String,
    /// Build the tree without a base, dropping every path not written
    #[serde(default)]
    pub clear_existing: bool,
}

impl CommitInfo {
    pub fn new(message: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            branch: branch.into(),
            clear_existing: false,
        }
    }

    pub fn clearing_existing(mut self, clear: bool) -> Self {
        self.clear_existing = clear;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(RepoPushError::InvalidInput(
                "Commit message is required".to_string(),
            ));
        }
        if self.branch.trim().is_empty() {
            return Err(RepoPushError::InvalidInput("Branch name is required".to_string()));
        }
        Ok(())
    }
}

/// The files a commit will write and delete, chosen by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPlan {
    pub writes: Vec<FileEntry>,
    pub deletes: Vec<FileEntry>,
}

impl CommitPlan {
    pub fn new(writes: Vec<FileEntry>, deletes: Vec<FileEntry>) -> Self {
        Self { writes, deletes }
    }

    /// Plan the new and modified files of a comparison, optionally with
    /// its deletions
    pub fn from_comparison(comparison: &FileComparison, include_deletes: bool) -> Self {
        let writes = comparison
            .new_files
            .iter()
            .chain(comparison.modified_files.iter())
            .cloned()
            .collect();
        let deletes = if include_deletes {
            comparison.deleted_files.clone()
        } else {
            Vec::new()
        };
        Self { writes, deletes }
    }

    /// Keep only paths accepted by `keep`; a strict subset is a valid plan
    pub fn retain(mut self, mut keep: impl FnMut(&FileEntry) -> bool) -> Self {
        self.writes.retain(|f| keep(f));
        self.deletes.retain(|f| keep(f));
        self
    }

    /// Non-directory files that will be written
    pub fn file_writes(&self) -> impl Iterator<Item = &FileEntry> {
        self.writes.iter().filter(|f| !f.is_directory)
    }

    /// Reject plans that cannot produce a meaningful commit
    pub fn validate(&self, info: &CommitInfo) -> Result<()> {
        Self::validate_sets(&self.writes, &self.deletes, info)
    }

    /// [`CommitPlan::validate`] over borrowed write and delete sets
    pub fn validate_sets(writes: &[FileEntry], deletes: &[FileEntry], info: &CommitInfo) -> Result<()> {
        if let Some(empty) = writes
            .iter()
            .find(|f| !f.is_directory && f.content.is_none())
        {
            return Err(RepoPushError::InvalidInput(format!(
                "File '{}' has no content to write",
                empty.path
            )));
        }

        let writes = writes.iter().filter(|f| !f.is_directory).count();
        if info.clear_existing && writes == 0 {
            return Err(RepoPushError::InvalidInput(
                "Replacing the branch contents requires at least one file to write".to_string(),
            ));
        }
        if writes == 0 && deletes.is_empty() {
            return Err(RepoPushError::NothingToCommit);
        }
        Ok(())
    }
}

/// One entry of a tree-creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    /// Text content sent inline; GitHub creates the blob
    Inline { path: String, content: String },
    /// A blob already created through the blobs endpoint
    Blob { path: String, sha: String },
    /// Removes the path from the base tree
    Delete { path: String },
}

impl TreeChange {
    pub fn path(&self) -> &str {
        match self {
            TreeChange::Inline { path, .. }
            | TreeChange::Blob { path, .. }
            | TreeChange::Delete { path } => path,
        }
    }
}

impl Serialize for TreeChange {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut entry = serializer.serialize_struct("TreeChange", 4)?;
        entry.serialize_field("path", self.path())?;
        entry.serialize_field("mode", REGULAR_FILE_MODE)?;
        entry.serialize_field("type", "blob")?;
        match self {
            TreeChange::Inline { content, .. } => entry.serialize_field("content", content)?,
            TreeChange::Blob { sha, .. } => entry.serialize_field("sha", sha)?,
            TreeChange::Delete { .. } => entry.serialize_field("sha", &Option::<String>::None)?,
        }
        entry.end()
    }
}

/// A commit object created through the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCommit {
    pub sha: String,
    pub html_url: String,
}

/// Outcome of a successful commit construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub commit_sha: String,
    pub commit_url: String,
    pub tree_sha: String,
    pub parent_sha: String,
    pub branch: String,
    /// The branch did not exist and was created at the new commit
    pub created_branch: bool,
}

//! Candidate file models

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::utils::blob_hash;

/// File payload: UTF-8 text or raw bytes, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    /// Classify raw bytes: valid UTF-8 becomes text, anything else stays binary
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => FileContent::Text(text),
            Err(e) => FileContent::Binary(e.into_bytes()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(text) => text.as_bytes(),
            FileContent::Binary(bytes) => bytes,
        }
    }
}

/// A file (or directory marker) in a candidate set.
///
/// `path` is relative and slash-separated with any shared archive root
/// already stripped. Directory entries carry no content and are never
/// hashed or uploaded. Entries listed as deleted carry only a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FileContent>,
    #[serde(default)]
    pub is_directory: bool,
}

impl FileEntry {
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(FileContent::Text(content.into())),
            is_directory: false,
        }
    }

    pub fn binary(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: Some(FileContent::Binary(content.into())),
            is_directory: false,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            is_directory: true,
        }
    }

    /// A path-only entry, used for files that exist remotely but not locally
    pub fn path_only(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            is_directory: false,
        }
    }

    /// Blob digest of the content, `None` for directories and path-only entries
    pub fn blob_sha(&self) -> Option<String> {
        if self.is_directory {
            return None;
        }
        self.content.as_ref().map(blob_hash::hash_content)
    }
}

/// Non-directory candidates with each path kept once, at its last
/// occurrence. Order follows those last occurrences.
pub fn latest_entries(candidates: &[FileEntry]) -> Vec<&FileEntry> {
    let last_index: HashMap<&str, usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.is_directory)
        .map(|(i, f)| (f.path.as_str(), i))
        .collect();

    candidates
        .iter()
        .enumerate()
        .filter(|(i, f)| !f.is_directory && last_index.get(f.path.as_str()) == Some(i))
        .map(|(_, f)| f)
        .collect()
}

//! GitHub account and repository models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Read-only repository descriptor as returned by the GitHub API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub default_branch: String,
    pub html_url: String,
    pub owner: RepositoryOwner,
}

impl Repository {
    pub fn owner_login(&self) -> &str {
        &self.owner.login
    }

    /// Browser URL of a branch
    pub fn branch_url(&self, branch: &str) -> String {
        let branch: Vec<_> = branch.split('/').map(urlencoding::encode).collect();
        format!("{}/tree/{}", self.html_url.trim_end_matches('/'), branch.join("/"))
    }
}

/// The user a token belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Scopes granted to a classic token, from `x-oauth-scopes`
    pub scopes: Vec<String>,
}

/// Scopes a token needs to push commits and read the profile
pub const REQUIRED_SCOPES: &[&str] = &["repo", "user:email"];

impl AuthenticatedUser {
    /// Scopes from [`REQUIRED_SCOPES`] that the token does not carry.
    ///
    /// Fine-grained tokens report no scopes at all; the result is then
    /// every required scope and callers should treat it as advisory.
    pub fn missing_scopes(&self) -> Vec<&'static str> {
        REQUIRED_SCOPES
            .iter()
            .copied()
            .filter(|required| !self.scopes.iter().any(|s| s.contains(required)))
            .collect()
    }
}

/// Input for creating a repository under the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRepository {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub private: bool,
    pub auto_init: bool,
}

impl NewRepository {
    pub fn new(name: impl Into<String>, description: Option<String>, private: bool) -> Self {
        Self {
            name: name.into(),
            description,
            private,
            auto_init: true,
        }
    }
}

//! HTTP implementation of [`GitHubApi`]

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ApiResult, GitHubApi, RemoteTree, RemoteTreeEntry, PAGE_SIZE};
use crate::config::Config;
use crate::error::{ApiError, ApiErrorKind, RepoPushError, Result};
use crate::models::{AuthenticatedUser, CreatedCommit, NewRepository, Repository, TreeChange};

const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// GitHub REST client bound to a single credential.
///
/// The token is fixed for the lifetime of the client; an expired token
/// makes every later call fail with [`ApiErrorKind::Authentication`].
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl GitHubClient {
    /// Create a client for `token` using the endpoint, user agent and
    /// per-request timeout from `config`
    pub fn new(token: impl Into<String>, config: &Config) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(RepoPushError::AuthenticationRequired);
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RepoPushError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.api_base().to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_base, owner, repo, path)
    }

    /// URL of `<prefix>/<branch>` with each `/`-separated part of the branch
    /// name percent-encoded, so names holding `#`, `?` or `%` stay in the path
    fn branch_url(&self, owner: &str, repo: &str, prefix: &str, branch: &str) -> String {
        self.repo_url(owner, repo, &format!("{}/{}", prefix, encode_branch(branch)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    /// Send a request and turn any non-success status into an [`ApiError`]
    async fn execute(&self, request: RequestBuilder, operation: &str) -> ApiResult<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "request failed" };
                ApiError::network(format!("{} ({}): {}", operation, kind, e))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let rate_limit_exhausted = status == StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0");

        let body = response.text().await.unwrap_or_default();
        let mut error = ApiError::from_response(status.as_u16(), &body, operation);
        if rate_limit_exhausted {
            error.kind = ApiErrorKind::RateLimited;
        }

        tracing::debug!(status = status.as_u16(), kind = ?error.kind, "{}: {}", operation, error.message);
        Err(error)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> ApiResult<T> {
        let response = self.execute(request, operation).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::decode(format!("{}: invalid response: {}", operation, e)))
    }
}

fn encode_branch(branch: &str) -> String {
    branch
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// GitHub answers a missing branch with "Branch not found"; a bare
/// "Not Found" means the repository itself is missing or hidden.
fn is_missing_branch(error: &ApiError) -> bool {
    error.is_not_found() && error.message.eq_ignore_ascii_case("Branch not found")
}

#[derive(Deserialize)]
struct ApiUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ApiBranch {
    name: String,
}

#[derive(Deserialize)]
struct ApiBranchDetail {
    commit: ApiSha,
}

#[derive(Deserialize)]
struct ApiSha {
    sha: String,
}

#[derive(Deserialize)]
struct ApiCommit {
    tree: ApiSha,
}

#[derive(Deserialize)]
struct ApiTree {
    tree: Vec<ApiTreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct ApiTreeItem {
    path: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    sha: Option<String>,
}

impl From<ApiTree> for RemoteTree {
    fn from(tree: ApiTree) -> Self {
        let entries = tree
            .tree
            .into_iter()
            .filter(|item| item.kind.as_deref() == Some("blob"))
            .filter_map(|item| match (item.path, item.sha) {
                (Some(path), Some(sha)) => Some(RemoteTreeEntry { path, sha }),
                _ => None,
            })
            .collect();

        RemoteTree {
            entries,
            truncated: tree.truncated,
        }
    }
}

#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'static str,
}

#[derive(Serialize)]
struct CreateTreeBody<'a> {
    tree: &'a [TreeChange],
    #[serde(skip_serializing_if = "Option::is_none")]
    base_tree: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: &'a [String],
}

#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn authenticated_user(&self) -> ApiResult<AuthenticatedUser> {
        let operation = "Failed to fetch authenticated user";
        let response = self.execute(self.http.get(self.url("/user")), operation).await?;

        let scopes: Vec<String> = response
            .headers()
            .get("x-oauth-scopes")
            .and_then(|v| v.to_str().ok())
            .map(|s| {
                s.split(',')
                    .map(|scope| scope.trim().to_string())
                    .filter(|scope| !scope.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let user: ApiUser = response
            .json()
            .await
            .map_err(|e| ApiError::decode(format!("{}: invalid response: {}", operation, e)))?;

        Ok(AuthenticatedUser {
            login: user.login,
            name: user.name,
            email: user.email,
            scopes,
        })
    }

    async fn list_repositories(&self, page: u32) -> ApiResult<Vec<Repository>> {
        let request = self.http.get(self.url("/user/repos")).query(&[
            ("sort", "updated".to_string()),
            ("per_page", PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ]);
        self.send_json(request, "Failed to fetch repositories").await
    }

    async fn list_branches(&self, owner: &str, repo: &str, page: u32) -> ApiResult<Vec<String>> {
        let request = self
            .http
            .get(self.repo_url(owner, repo, "/branches"))
            .query(&[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())]);
        let branches: Vec<ApiBranch> = self.send_json(request, "Failed to fetch branches").await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn branch_head(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> ApiResult<Option<String>> {
        let request = self
            .http
            .get(self.branch_url(owner, repo, "/branches", branch));
        match self
            .send_json::<ApiBranchDetail>(request, "Failed to fetch branch")
            .await
        {
            Ok(detail) => Ok(Some(detail.commit.sha)),
            Err(e) if is_missing_branch(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn commit_tree(&self, owner: &str, repo: &str, commit_sha: &str) -> ApiResult<String> {
        let request = self
            .http
            .get(self.repo_url(owner, repo, &format!("/git/commits/{}", commit_sha)));
        let commit: ApiCommit = self.send_json(request, "Failed to fetch commit").await?;
        Ok(commit.tree.sha)
    }

    async fn tree_recursive(
        &self,
        owner: &str,
        repo: &str,
        tree_sha: &str,
    ) -> ApiResult<RemoteTree> {
        let request = self
            .http
            .get(self.repo_url(owner, repo, &format!("/git/trees/{}", tree_sha)))
            .query(&[("recursive", "1")]);
        let tree: ApiTree = self.send_json(request, "Failed to fetch tree").await?;
        Ok(tree.into())
    }

    async fn create_blob(
        &self,
        owner: &str,
        repo: &str,
        base64_content: &str,
    ) -> ApiResult<String> {
        let request = self
            .http
            .post(self.repo_url(owner, repo, "/git/blobs"))
            .json(&CreateBlobBody {
                content: base64_content,
                encoding: "base64",
            });
        let blob: ApiSha = self.send_json(request, "Failed to create blob").await?;
        Ok(blob.sha)
    }

    async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        changes: &[TreeChange],
        base_tree: Option<&str>,
    ) -> ApiResult<String> {
        let request = self
            .http
            .post(self.repo_url(owner, repo, "/git/trees"))
            .json(&CreateTreeBody {
                tree: changes,
                base_tree,
            });
        let tree: ApiSha = self.send_json(request, "Failed to create tree").await?;
        Ok(tree.sha)
    }

    async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        message: &str,
        tree_sha: &str,
        parents: &[String],
    ) -> ApiResult<CreatedCommit> {
        let request = self
            .http
            .post(self.repo_url(owner, repo, "/git/commits"))
            .json(&CreateCommitBody {
                message,
                tree: tree_sha,
                parents,
            });
        self.send_json(request, "Failed to create commit").await
    }

    async fn update_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> ApiResult<()> {
        let request = self
            .http
            .patch(self.branch_url(owner, repo, "/git/refs/heads", branch))
            .json(&UpdateRefBody { sha, force: false });
        self.execute(request, "Failed to update branch reference")
            .await
            .map(|_| ())
    }

    async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> ApiResult<()> {
        let request = self
            .http
            .post(self.repo_url(owner, repo, "/git/refs"))
            .json(&CreateRefBody {
                ref_name: format!("refs/heads/{}", branch),
                sha,
            });
        self.execute(request, "Failed to create branch reference")
            .await
            .map(|_| ())
    }

    async fn create_repository(&self, input: &NewRepository) -> ApiResult<Repository> {
        let request = self.http.post(self.url("/user/repos")).json(input);
        self.send_json(request, "Failed to create repository").await
    }
}

//! In-memory GitHub for exercising the engine without a network

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};

use repopush::error::{ApiError, ApiErrorKind};
use repopush::models::{
    AuthenticatedUser, CreatedCommit, NewRepository, Repository, RepositoryOwner, TreeChange,
};
use repopush::services::github::{ApiResult, GitHubApi, RemoteTree, RemoteTreeEntry, PAGE_SIZE};
use repopush::utils::blob_hash::{hash_bytes, hash_text};

pub const OWNER: &str = "octocat";
pub const REPO: &str = "demo";

pub fn repository() -> Repository {
    repository_named(REPO)
}

pub fn repository_named(name: &str) -> Repository {
    Repository {
        id: 1,
        name: name.to_string(),
        full_name: format!("{}/{}", OWNER, name),
        description: None,
        private: false,
        updated_at: None,
        default_branch: "main".to_string(),
        html_url: format!("https://github.com/{}/{}", OWNER, name),
        owner: RepositoryOwner {
            login: OWNER.to_string(),
            avatar_url: None,
        },
    }
}

struct StoredCommit {
    tree: String,
    parents: Vec<String>,
    message: String,
}

#[derive(Default)]
struct State {
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, StoredCommit>,
    branches: BTreeMap<String, String>,
    repositories: Vec<Repository>,
    calls: Vec<&'static str>,
    failing: HashMap<&'static str, ApiError>,
    concurrent_writer: Option<String>,
    transient_failures: u32,
    truncate_listing: bool,
    scopes: Vec<String>,
}

/// A single repository's object store and refs
#[derive(Default)]
pub struct FakeGitHub {
    state: Mutex<State>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().scopes = vec!["repo".to_string(), "user:email".to_string()];
        fake
    }

    /// A repository whose `branch` holds one commit with `files`
    pub fn with_branch(branch: &str, files: &[(&str, &str)]) -> Self {
        let fake = Self::new();
        fake.seed_branch(branch, files);
        fake
    }

    /// Create or move `branch` to a new commit holding exactly `files`
    pub fn seed_branch(&self, branch: &str, files: &[(&str, &str)]) -> String {
        let mut state = self.state.lock().unwrap();
        let mut entries = BTreeMap::new();
        for (path, content) in files {
            let sha = hash_text(content);
            state.blobs.insert(sha.clone(), content.as_bytes().to_vec());
            entries.insert(path.to_string(), sha);
        }
        let tree = state.store_tree(entries);
        let parents = state.branches.get(branch).cloned().into_iter().collect();
        let commit = state.store_commit(tree, parents, "seed".to_string());
        state.branches.insert(branch.to_string(), commit.clone());
        commit
    }

    pub fn add_repositories(&self, repositories: impl IntoIterator<Item = Repository>) {
        self.state.lock().unwrap().repositories.extend(repositories);
    }

    /// Make every call of `operation` fail with a server error
    pub fn fail_on(&self, operation: &'static str) {
        self.fail_with(
            operation,
            ApiError::new(ApiErrorKind::Server, format!("{} unavailable", operation), Some(500)),
        );
    }

    /// Make every call of `operation` fail with `error`
    pub fn fail_with(&self, operation: &'static str, error: ApiError) {
        self.state.lock().unwrap().failing.insert(operation, error);
    }

    /// Have another writer advance `branch` right after the next commit
    /// object is created
    pub fn advance_during_commit(&self, branch: &str) {
        self.state.lock().unwrap().concurrent_writer = Some(branch.to_string());
    }

    /// Fail the next `count` repository listings with a 503
    pub fn fail_transiently(&self, count: u32) {
        self.state.lock().unwrap().transient_failures = count;
    }

    pub fn truncate_listings(&self) {
        self.state.lock().unwrap().truncate_listing = true;
    }

    pub fn set_scopes(&self, scopes: &[&str]) {
        self.state.lock().unwrap().scopes = scopes.iter().map(|s| s.to_string()).collect();
    }

    pub fn head(&self, branch: &str) -> Option<String> {
        self.state.lock().unwrap().branches.get(branch).cloned()
    }

    pub fn parents(&self, commit: &str) -> Vec<String> {
        self.state.lock().unwrap().commits[commit].parents.clone()
    }

    pub fn message(&self, commit: &str) -> String {
        self.state.lock().unwrap().commits[commit].message.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.state.lock().unwrap().commits.len()
    }

    /// Path to content of every file on `branch`
    pub fn files(&self, branch: &str) -> BTreeMap<String, Vec<u8>> {
        let state = self.state.lock().unwrap();
        let head = &state.branches[branch];
        let tree = &state.trees[&state.commits[head].tree];
        tree.iter()
            .map(|(path, sha)| (path.clone(), state.blobs[sha].clone()))
            .collect()
    }

    pub fn text_files(&self, branch: &str) -> BTreeMap<String, String> {
        self.files(branch)
            .into_iter()
            .map(|(path, bytes)| (path, String::from_utf8(bytes).unwrap()))
            .collect()
    }

    /// Operations in the order they were called
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn enter(&self, operation: &'static str) -> ApiResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation);
        if let Some(error) = state.failing.get(operation) {
            return Err(error.clone());
        }
        Ok(state)
    }
}

impl State {
    fn store_tree(&mut self, entries: BTreeMap<String, String>) -> String {
        let listing: String = entries
            .iter()
            .map(|(path, sha)| format!("{} {}\n", path, sha))
            .collect();
        let sha = hash_text(&format!("tree\n{}", listing));
        self.trees.insert(sha.clone(), entries);
        sha
    }

    fn store_commit(&mut self, tree: String, parents: Vec<String>, message: String) -> String {
        let sha = hash_text(&format!(
            "commit {} {} {} {}",
            tree,
            parents.join(","),
            message,
            self.commits.len()
        ));
        self.commits.insert(
            sha.clone(),
            StoredCommit {
                tree,
                parents,
                message,
            },
        );
        sha
    }

    fn is_ancestor(&self, ancestor: &str, commit: &str) -> bool {
        let mut pending = vec![commit.to_string()];
        while let Some(sha) = pending.pop() {
            if sha == ancestor {
                return true;
            }
            if let Some(stored) = self.commits.get(&sha) {
                pending.extend(stored.parents.iter().cloned());
            }
        }
        false
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::new(ApiErrorKind::NotFound, format!("{} Not Found", what), Some(404))
}

fn validation(message: &str) -> ApiError {
    ApiError::new(ApiErrorKind::Validation, message, Some(422))
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn authenticated_user(&self) -> ApiResult<AuthenticatedUser> {
        let state = self.enter("authenticated_user")?;
        Ok(AuthenticatedUser {
            login: OWNER.to_string(),
            name: Some("The Octocat".to_string()),
            email: None,
            scopes: state.scopes.clone(),
        })
    }

    async fn list_repositories(&self, page: u32) -> ApiResult<Vec<Repository>> {
        let mut state = self.enter("list_repositories")?;
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(ApiError::new(ApiErrorKind::Server, "Service Unavailable", Some(503)));
        }
        Ok(state
            .repositories
            .iter()
            .skip(((page - 1) * PAGE_SIZE) as usize)
            .take(PAGE_SIZE as usize)
            .cloned()
            .collect())
    }

    async fn list_branches(&self, _owner: &str, _repo: &str, page: u32) -> ApiResult<Vec<String>> {
        let state = self.enter("list_branches")?;
        Ok(state
            .branches
            .keys()
            .skip(((page - 1) * PAGE_SIZE) as usize)
            .take(PAGE_SIZE as usize)
            .cloned()
            .collect())
    }

    async fn branch_head(&self, _owner: &str, _repo: &str, branch: &str) -> ApiResult<Option<String>> {
        let state = self.enter("branch_head")?;
        Ok(state.branches.get(branch).cloned())
    }

    async fn commit_tree(&self, _owner: &str, _repo: &str, commit_sha: &str) -> ApiResult<String> {
        let state = self.enter("commit_tree")?;
        state
            .commits
            .get(commit_sha)
            .map(|c| c.tree.clone())
            .ok_or_else(|| not_found("Commit"))
    }

    async fn tree_recursive(&self, _owner: &str, _repo: &str, tree_sha: &str) -> ApiResult<RemoteTree> {
        let state = self.enter("tree_recursive")?;
        let tree_sha = match state.commits.get(tree_sha) {
            Some(commit) => commit.tree.clone(),
            None => tree_sha.to_string(),
        };
        let tree = state.trees.get(&tree_sha).ok_or_else(|| not_found("Tree"))?;
        Ok(RemoteTree {
            entries: tree
                .iter()
                .map(|(path, sha)| RemoteTreeEntry {
                    path: path.clone(),
                    sha: sha.clone(),
                })
                .collect(),
            truncated: state.truncate_listing,
        })
    }

    async fn create_blob(&self, _owner: &str, _repo: &str, base64_content: &str) -> ApiResult<String> {
        let mut state = self.enter("create_blob")?;
        let bytes = STANDARD
            .decode(base64_content)
            .map_err(|_| validation("Invalid base64 content"))?;
        let sha = hash_bytes(&bytes);
        state.blobs.insert(sha.clone(), bytes);
        Ok(sha)
    }

    async fn create_tree(
        &self,
        _owner: &str,
        _repo: &str,
        changes: &[TreeChange],
        base_tree: Option<&str>,
    ) -> ApiResult<String> {
        let mut state = self.enter("create_tree")?;
        let mut entries = match base_tree {
            Some(base) => state.trees.get(base).cloned().ok_or_else(|| not_found("Tree"))?,
            None => BTreeMap::new(),
        };
        for change in changes {
            match change {
                TreeChange::Inline { path, content } => {
                    let sha = hash_text(content);
                    state.blobs.insert(sha.clone(), content.as_bytes().to_vec());
                    entries.insert(path.clone(), sha);
                }
                TreeChange::Blob { path, sha } => {
                    if !state.blobs.contains_key(sha) {
                        return Err(validation("tree.sha is not a valid blob"));
                    }
                    entries.insert(path.clone(), sha.clone());
                }
                TreeChange::Delete { path } => {
                    entries.remove(path);
                }
            }
        }
        Ok(state.store_tree(entries))
    }

    async fn create_commit(
        &self,
        _owner: &str,
        _repo: &str,
        message: &str,
        tree_sha: &str,
        parents: &[String],
    ) -> ApiResult<CreatedCommit> {
        let mut state = self.enter("create_commit")?;
        if !state.trees.contains_key(tree_sha) {
            return Err(validation("Tree SHA does not exist"));
        }
        if parents.iter().any(|p| !state.commits.contains_key(p)) {
            return Err(validation("Parent SHA does not exist"));
        }
        let sha = state.store_commit(tree_sha.to_string(), parents.to_vec(), message.to_string());
        if let Some(branch) = state.concurrent_writer.take() {
            let head = state.branches[&branch].clone();
            let tree = state.commits[&head].tree.clone();
            let other = state.store_commit(tree, vec![head], "concurrent change".to_string());
            state.branches.insert(branch, other);
        }
        Ok(CreatedCommit {
            html_url: format!("https://github.com/{}/{}/commit/{}", OWNER, REPO, sha),
            sha,
        })
    }

    async fn update_branch(&self, _owner: &str, _repo: &str, branch: &str, sha: &str) -> ApiResult<()> {
        let mut state = self.enter("update_branch")?;
        let current = state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| validation("Reference does not exist"))?;
        if !state.is_ancestor(&current, sha) {
            return Err(ApiError::from_response(
                422,
                r#"{"message":"Update is not a fast forward"}"#,
                "Failed to update reference",
            ));
        }
        state.branches.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn create_branch(&self, _owner: &str, _repo: &str, branch: &str, sha: &str) -> ApiResult<()> {
        let mut state = self.enter("create_branch")?;
        if state.branches.contains_key(branch) {
            return Err(validation("Reference already exists"));
        }
        if !state.commits.contains_key(sha) {
            return Err(validation("Object does not exist"));
        }
        state.branches.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn create_repository(&self, input: &NewRepository) -> ApiResult<Repository> {
        let mut state = self.enter("create_repository")?;
        if state.repositories.iter().any(|r| r.name == input.name) {
            return Err(ApiError::from_response(
                422,
                r#"{"message":"Repository creation failed.","errors":[{"message":"name already exists on this account"}]}"#,
                "Failed to create repository",
            ));
        }
        let mut repository = repository_named(&input.name);
        repository.id = state.repositories.len() as u64 + 1;
        repository.description = input.description.clone();
        repository.private = input.private;
        state.repositories.push(repository.clone());
        Ok(repository)
    }
}

//! Service layer for repopush
//!
//! The diff engine and commit constructor are the core; the catalog,
//! archive and credential services surround them.

pub mod archive_service;
pub mod catalog_service;
pub mod commit_service;
pub mod credentials_service;
pub mod diff_service;
pub mod github;
pub mod progress;
pub mod retry;

pub use catalog_service::RepositoryCatalog;
pub use commit_service::CommitConstructor;
pub use credentials_service::{resolve_token, TokenSource, TokenStore};
pub use diff_service::DiffEngine;
pub use github::{GitHubApi, GitHubClient};
pub use progress::{ProgressCallback, UploadStage};
pub use retry::RetryPolicy;

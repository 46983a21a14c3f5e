//! repopush - push a project snapshot to GitHub as one commit
//!
//! Compares a set of files (usually extracted from a ZIP archive) with the
//! tree of a GitHub branch, then writes the differences as a single commit
//! using only the git data API: blobs, a tree and a commit are created and
//! the branch is fast-forwarded to the result.

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{ApiError, ApiErrorKind, RepoPushError, Result};

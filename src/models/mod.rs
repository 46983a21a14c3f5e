//! Data models for repopush

pub mod commit;
pub mod diff;
pub mod file;
pub mod repository;

pub use commit::*;
pub use diff::*;
pub use file::*;
pub use repository::*;

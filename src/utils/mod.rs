//! Utility helpers

pub mod blob_hash;

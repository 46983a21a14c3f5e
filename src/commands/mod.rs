//! Command flows used by the `repopush` binary

pub mod account;
pub mod push;

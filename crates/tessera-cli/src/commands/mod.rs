//! CLI command implementations.

pub mod check;
pub mod config;
pub mod fixture;
pub mod version;

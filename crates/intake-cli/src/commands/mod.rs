//! Subcommand implementations.

pub mod datasets;
pub mod find_match;
pub mod schema;
pub mod tables;
pub mod upload;

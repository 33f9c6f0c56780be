//! CLI subcommand implementations.

pub mod request;
pub mod url;

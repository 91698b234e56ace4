//! CLI commands

pub mod fetch;
pub mod list;
pub mod monitor;
pub mod parse;

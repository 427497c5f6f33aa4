//! Tooling
//!
//! Command-line entry points and the text rendering they use.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands, OutputFormat};

//! CLI surface: argument definitions and subcommand implementations.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};

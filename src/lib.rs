//! burrow - reproducible package builds inside managed chroot environments
//!
//! Library crate exposing the toolset registry, environment workers and
//! the process launching layer used by the `burrow` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod launch;
pub mod script;
pub mod toolset;
pub mod util;
pub mod worker;

pub use error::{BurrowError, BurrowResult};

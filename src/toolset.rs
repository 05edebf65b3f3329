//! Resolved toolset model: the per-build view of one registry entry.

use crate::error::{BurrowError, BurrowResult};
use crate::util;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// Backend identifier selecting the external chroot tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Copy-on-write pbuilder variant (`cowbuilder`).
    Cowbuilder,
    /// Fedora-style mock chroot builder (`mock`).
    Mock,
}

impl Backend {
    /// Parse a backend id from the registry.
    pub fn parse(id: &str) -> BurrowResult<Self> {
        match id {
            "cowbuilder" => Ok(Backend::Cowbuilder),
            "mock" => Ok(Backend::Mock),
            other => Err(BurrowError::UnknownBackend(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Cowbuilder => "cowbuilder",
            Backend::Mock => "mock",
        }
    }
}

/// A custom package repository made available inside the environment.
#[derive(Debug, Clone)]
pub struct Repository {
    /// Source line, e.g. `deb http://host/debian stable main`.
    pub source: String,
    /// Optional URL of a signing key to trust.
    pub key_url: Option<String>,
}

impl Repository {
    /// Shell commands registering this repository inside the chroot.
    ///
    /// Concatenated with other repositories' commands and executed once via
    /// a temporary script.
    pub fn setup_commands(&self) -> String {
        let mut commands = String::new();
        if let Some(key) = &self.key_url {
            commands.push_str(&format!("wget -q -O - {key} | apt-key add -\n"));
        }
        let tag = &util::digest(&self.source)[..8];
        commands.push_str(&format!(
            "echo \"{}\" > /etc/apt/sources.list.d/burrow-{}.list\n",
            self.source, tag
        ));
        commands
    }
}

/// A named, resolved toolset configuration, immutable during one build.
#[derive(Debug, Clone)]
pub struct Toolset {
    pub name: String,
    pub backend: Backend,
    /// Extra packages, order preserved for display and digesting.
    pub packages: Vec<String>,
    pub repositories: Vec<Repository>,
    /// Post-setup shell command, run with fail-fast/verbose semantics.
    pub setup_command: String,
    /// Extra arguments appended to the backend's creation command.
    pub setup_arguments: Vec<String>,
    /// Configuration timestamp; base environments not strictly newer than
    /// this are stale.
    pub last_modified: SystemTime,
}

impl Toolset {
    /// Cache-key digest of the package list (space-joined, order kept).
    pub fn package_digest(&self) -> String {
        util::digest(&self.packages.join(" "))
    }
}

/// The worker node an environment lives on.
#[derive(Debug, Clone)]
pub struct Node {
    /// Node-local root directory holding cached base environments.
    pub root: PathBuf,
    /// Executor slot number, keeping per-slot environments disjoint for
    /// backends that cannot share a base directory.
    pub executor: u32,
}

impl Node {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            executor: 0,
        }
    }

    pub fn with_executor(mut self, executor: u32) -> Self {
        self.executor = executor;
        self
    }
}

/// Whether a cached base environment is still valid.
///
/// Valid iff the path exists and its modification time is strictly newer
/// than the toolset's last-modified timestamp; anything else must be
/// rebuilt.
pub async fn base_is_current(base: &Path, last_modified: SystemTime) -> bool {
    match fs::metadata(base).await {
        Ok(meta) => match meta.modified() {
            Ok(mtime) => mtime > last_modified,
            Err(_) => false,
        },
        Err(_) => false,
    }
}

//! Chroot backend abstraction
//!
//! Provides a trait for environment lifecycle and execution operations
//! implemented by the interchangeable backend tools (cowbuilder, mock).

mod cowbuilder;
mod mock;

pub use cowbuilder::CowbuilderWorker;
pub use mock::MockWorker;

use crate::error::{BurrowError, BurrowResult};
use crate::launch::{CommandInvocation, Listener, ProcessLauncher};
use crate::toolset::{Backend, Node, Repository, Toolset};
use crate::util;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Request to run user commands inside an existing base environment.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub base_path: PathBuf,
    pub workspace: PathBuf,
    /// User commands, run with fail-fast and verbose tracing.
    pub commands: String,
    /// Host environment propagated into the chroot behind unset-guards.
    pub environment: HashMap<String, String>,
    /// Extra bind-mount paths, space separated; may be empty.
    pub bind_mounts: String,
    /// Run the commands as root instead of the synthesized build user.
    pub run_as_root: bool,
}

/// Request to build a source package inside an existing base environment.
#[derive(Debug, Clone)]
pub struct PackageBuildRequest {
    pub base_path: PathBuf,
    pub workspace: PathBuf,
    /// Glob for the source package, resolved against the workspace after
    /// `${VAR}` expansion; must match exactly one file.
    pub source_package: String,
    pub arch_policy: ArchPolicy,
    pub environment: HashMap<String, String>,
}

/// Selection of architecture-independent vs architecture-specific output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchPolicy {
    /// No preference configured; build everything.
    Default,
    /// Explicit: build architecture-independent and -specific binaries.
    AllAndArch,
    /// Explicit: architecture-specific binaries only.
    ArchOnly,
    /// Legacy mode: build everything iff the label appears among the build
    /// environment's *values*. This matches the long-standing observed
    /// behavior (the values, not the keys, are searched) and is kept
    /// bug-for-bug until the intended semantics are confirmed.
    MatchLabel(String),
}

impl ArchPolicy {
    /// Resolve to the debbuild flag: `-b` for everything, `-B` for
    /// architecture-specific only.
    pub fn debbuild_flag(&self, environment: &HashMap<String, String>) -> &'static str {
        match self {
            ArchPolicy::Default | ArchPolicy::AllAndArch => "-b",
            ArchPolicy::ArchOnly => "-B",
            ArchPolicy::MatchLabel(label) => {
                if environment.values().any(|v| v == label) {
                    "-b"
                } else {
                    "-B"
                }
            }
        }
    }
}

/// Abstract chroot backend interface
///
/// Lifecycle operations (`set_up`, `update_repositories`, `clean_up`),
/// execution operations (`run_command`, `build_package`) and probes share
/// one launcher/listener pair given at construction. Boolean results mean
/// "the backend tool reported failure"; `Err` is reserved for
/// configuration errors and platform I/O failures.
#[async_trait]
pub trait ChrootWorker: Send + Sync {
    /// Backend name, also the directory namespacing its cached bases.
    fn name(&self) -> &'static str;

    /// Absolute path of the backend tool.
    fn tool(&self) -> &'static str;

    /// Packages installed at environment creation.
    fn default_packages(&self) -> &'static [&'static str];

    /// Reduced package set retried once if creation fails.
    fn fallback_packages(&self) -> &'static [&'static str];

    /// Cache location for this toolset on this node.
    fn base_path(&self, toolset: &Toolset, node: &Node) -> PathBuf;

    /// Create or validate the cached base environment.
    async fn set_up(&self, toolset: &Toolset, node: &Node) -> BurrowResult<PathBuf>;

    /// Run user commands inside the environment.
    async fn run_command(&self, request: &CommandRequest) -> BurrowResult<bool>;

    /// Build a source package inside the environment.
    async fn build_package(&self, request: &PackageBuildRequest) -> BurrowResult<bool>;

    /// Install extra packages into the environment.
    async fn install_packages(
        &self,
        base_path: &Path,
        packages: &[String],
        force_install: bool,
    ) -> BurrowResult<bool>;

    /// Register custom repositories inside the environment.
    async fn add_repositories(
        &self,
        base_path: &Path,
        repositories: &[Repository],
    ) -> BurrowResult<bool>;

    /// Re-synchronize package indices; idempotent.
    async fn update_repositories(&self, base_path: &Path) -> BurrowResult<bool>;

    /// Best-effort teardown of backend-internal caches.
    async fn clean_up(&self, base_path: &Path) -> BurrowResult<bool>;

    /// Probe whether the backend tool is installed and new enough.
    async fn health_check(&self) -> bool;
}

/// Create the worker for a backend id.
pub fn create_worker(
    backend: Backend,
    launcher: Arc<dyn ProcessLauncher>,
    listener: Arc<dyn Listener>,
) -> Box<dyn ChrootWorker> {
    match backend {
        Backend::Cowbuilder => Box::new(CowbuilderWorker::new(launcher, listener)),
        Backend::Mock => Box::new(MockWorker::new(launcher, listener)),
    }
}

/// The single space-joined bind-mount argument value.
///
/// The workspace is always mounted; configured extras are appended into the
/// same argument because the backend expects one space-delimited value.
pub(crate) fn bind_mounts_argument(workspace: &Path, extra: &str) -> String {
    let extra = extra.trim();
    if extra.is_empty() {
        workspace.display().to_string()
    } else {
        format!("{} {}", workspace.display(), extra)
    }
}

/// Probe a tool's help output for a feature marker.
///
/// Any probe failure is logged and treated as "feature absent"; a probe
/// never fails the surrounding operation.
pub(crate) async fn help_probe(
    launcher: &dyn ProcessLauncher,
    argv: &[&str],
    marker: &str,
) -> bool {
    let invocation = CommandInvocation::new(argv.iter().copied()).arg("--help").quiet();
    match launcher.launch(&invocation).await {
        Ok(result) => result.stdout.contains(marker),
        Err(e) => {
            warn!("Help probe '{}' failed: {}", invocation.display(), e);
            false
        }
    }
}

/// Resolve the source package glob to exactly one workspace file.
///
/// `${VAR}` references are expanded from the build environment first. Zero
/// or multiple matches is a configuration error; no backend command is
/// invoked in that case.
pub(crate) fn resolve_source_package(
    workspace: &Path,
    pattern: &str,
    environment: &HashMap<String, String>,
) -> BurrowResult<PathBuf> {
    let expanded = util::expand_macros(pattern, environment);
    let full = workspace.join(&expanded).display().to_string();
    let entries = glob::glob(&full).map_err(|e| BurrowError::SourcePackagePattern {
        pattern: expanded.clone(),
        reason: e.to_string(),
    })?;
    let mut matches: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
    if matches.len() != 1 {
        return Err(BurrowError::SourcePackageCount {
            pattern: expanded,
            count: matches.len(),
        });
    }
    Ok(matches.remove(0))
}

//! Cowbuilder backend
//!
//! Drives the copy-on-write pbuilder variant. Every tool invocation goes
//! through sudo; the cached base environment is a `.cow` directory keyed by
//! the toolset's package digest.

use crate::error::{BurrowError, BurrowResult};
use crate::launch::{CommandInvocation, HostUser, Listener, ProcessLauncher};
use crate::script::{self, ScriptFile, SHEBANG, STRICT_MODE};
use crate::toolset::{self, Node, Repository, Toolset};
use crate::worker::{
    bind_mounts_argument, help_probe, resolve_source_package, ChrootWorker, CommandRequest,
    PackageBuildRequest,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

const TOOL: &str = "/usr/sbin/cowbuilder";

const DEFAULT_PACKAGES: &[&str] = &[
    "software-properties-common",
    // lets the create step succeed on older releases before the fallback set kicks in
    "python3-software-properties",
    "sudo",
    "gnupg",
    "wget",
];

const FALLBACK_PACKAGES: &[&str] = &["python-software-properties", "sudo", "gnupg", "wget"];

/// Chroot worker using cowbuilder
pub struct CowbuilderWorker {
    launcher: Arc<dyn ProcessLauncher>,
    listener: Arc<dyn Listener>,
}

impl CowbuilderWorker {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, listener: Arc<dyn Listener>) -> Self {
        Self { launcher, listener }
    }

    /// `sudo cowbuilder <action> --basepath <path>` prefix shared by all
    /// actions.
    fn base_invocation(&self, base_path: &Path, action: &str) -> CommandInvocation {
        CommandInvocation::new(["sudo", TOOL])
            .arg(action)
            .arg("--basepath")
            .arg(base_path.display().to_string())
    }

    /// One `--create` attempt with the given package set.
    async fn try_create(
        &self,
        base_path: &Path,
        packages: &[&str],
        toolset: &Toolset,
    ) -> BurrowResult<bool> {
        let mut invocation = self.base_invocation(base_path, "--create");
        if !packages.is_empty() {
            invocation = invocation.arg("--extrapackages").arg(packages.join(" "));
        }
        invocation = invocation.args(toolset.setup_arguments.iter().cloned());
        Ok(self.launcher.launch(&invocation).await?.success())
    }
}

#[async_trait]
impl ChrootWorker for CowbuilderWorker {
    fn name(&self) -> &'static str {
        "cowbuilder"
    }

    fn tool(&self) -> &'static str {
        TOOL
    }

    fn default_packages(&self) -> &'static [&'static str] {
        DEFAULT_PACKAGES
    }

    fn fallback_packages(&self) -> &'static [&'static str] {
        FALLBACK_PACKAGES
    }

    fn base_path(&self, toolset: &Toolset, node: &Node) -> PathBuf {
        node.root.join(self.name()).join(format!(
            "{}-{}.cow",
            toolset.name,
            toolset.package_digest()
        ))
    }

    async fn set_up(&self, toolset: &Toolset, node: &Node) -> BurrowResult<PathBuf> {
        let base_path = self.base_path(toolset, node);

        if toolset::base_is_current(&base_path, toolset.last_modified).await {
            debug!("Reusing base environment {}", base_path.display());
            return Ok(base_path);
        }

        if fs::metadata(&base_path).await.is_ok() {
            info!("Base environment {} is stale, rebuilding", base_path.display());
            fs::remove_dir_all(&base_path).await.map_err(|e| {
                BurrowError::io(format!("removing stale base {}", base_path.display()), e)
            })?;
        }
        if let Some(parent) = base_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BurrowError::io(format!("creating {}", parent.display()), e))?;
        }

        if !self.try_create(&base_path, DEFAULT_PACKAGES, toolset).await? {
            warn!("Environment creation failed, retrying with the fallback package set");
            if !self.try_create(&base_path, FALLBACK_PACKAGES, toolset).await? {
                self.listener.fatal("Could not setup chroot environment");
                return Err(BurrowError::SetupFailed(toolset.name.clone()));
            }
        }

        if !self
            .add_repositories(&base_path, &toolset.repositories)
            .await?
        {
            return Err(BurrowError::SetupFailed(toolset.name.clone()));
        }

        if !toolset.packages.is_empty() {
            let invocation = self
                .base_invocation(&base_path, "--update")
                .arg("--extrapackages")
                .arg(toolset.packages.join(" "));
            if !self.launcher.launch(&invocation).await?.success() {
                self.listener.fatal("Could not install additional packages.");
                return Err(BurrowError::SetupFailed(toolset.name.clone()));
            }
        }

        if !toolset.setup_command.is_empty() {
            let contents = format!("{SHEBANG}{STRICT_MODE}{}", toolset.setup_command);
            let setup_script = ScriptFile::create(&node.root, &contents).await?;
            let invocation = self
                .base_invocation(&base_path, "--execute")
                .arg("--save-after-exec")
                .arg("--")
                .arg(setup_script.path().display().to_string());
            if !self.launcher.launch(&invocation).await?.success() {
                self.listener.fatal("Post-setup command failed.");
                return Err(BurrowError::SetupFailed(toolset.name.clone()));
            }
        }

        Ok(base_path)
    }

    async fn run_command(&self, request: &CommandRequest) -> BurrowResult<bool> {
        let user = HostUser::probe(self.launcher.as_ref()).await?;

        let inner =
            script::run_script(&request.workspace, &request.commands, &request.environment);
        let inner_script = ScriptFile::create(&request.workspace, &inner).await?;
        let wrapper = script::privilege_wrapper(
            inner_script.path(),
            &request.workspace,
            &user,
            request.run_as_root,
        );
        let wrapper_script = ScriptFile::create(&request.workspace, &wrapper).await?;

        let mut invocation = CommandInvocation::new(["sudo", TOOL])
            .arg("--execute")
            .arg("--bindmounts")
            .arg(bind_mounts_argument(&request.workspace, &request.bind_mounts));
        // optional hard-kill-on-timeout support in newer cowbuilders
        if help_probe(self.launcher.as_ref(), &["sudo", TOOL], "--killer").await {
            invocation = invocation.arg("--killer");
        }
        invocation = invocation
            .arg("--basepath")
            .arg(request.base_path.display().to_string())
            .arg("--")
            .arg(wrapper_script.path().display().to_string())
            .envs(&request.environment);

        let result = self.launcher.launch(&invocation).await?;
        Ok(result.success())
    }

    async fn build_package(&self, request: &PackageBuildRequest) -> BurrowResult<bool> {
        let buildplace = request.workspace.join("buildroot");
        let results = request.workspace.join("results");
        for dir in [&buildplace, &results] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| BurrowError::io(format!("creating {}", dir.display()), e))?;
        }

        let source = match resolve_source_package(
            &request.workspace,
            &request.source_package,
            &request.environment,
        ) {
            Ok(source) => source,
            Err(e) => {
                self.listener.fatal(&e.to_string());
                return Err(e);
            }
        };

        let arch_flag = request.arch_policy.debbuild_flag(&request.environment);
        let invocation = CommandInvocation::new(["sudo", TOOL])
            .arg("--build")
            .arg("--buildplace")
            .arg(buildplace.display().to_string())
            .arg("--buildresult")
            .arg(results.display().to_string())
            .arg("--basepath")
            .arg(request.base_path.display().to_string())
            .arg("--debbuildopts")
            .arg(format!("\"{arch_flag}\""))
            .arg("--")
            .arg(source.display().to_string())
            .envs(&request.environment);

        let result = self.launcher.launch(&invocation).await?;
        Ok(result.success())
    }

    async fn install_packages(
        &self,
        base_path: &Path,
        packages: &[String],
        force_install: bool,
    ) -> BurrowResult<bool> {
        let mut invocation = self
            .base_invocation(base_path, "--update")
            .arg("--extrapackages")
            .arg(packages.join(" "));
        if force_install {
            invocation = invocation.arg("--allow-untrusted");
        }
        Ok(self.launcher.launch(&invocation).await?.success())
    }

    async fn add_repositories(
        &self,
        base_path: &Path,
        repositories: &[Repository],
    ) -> BurrowResult<bool> {
        if repositories.is_empty() {
            return Ok(true);
        }
        let commands: String = repositories.iter().map(Repository::setup_commands).collect();
        let script_dir = base_path.parent().unwrap_or(base_path);
        let repo_script = ScriptFile::create(script_dir, &commands).await?;
        let invocation = self
            .base_invocation(base_path, "--execute")
            .arg("--save-after-exec")
            .arg("--")
            .arg(repo_script.path().display().to_string());
        if !self.launcher.launch(&invocation).await?.success() {
            self.listener.fatal("Could not add custom repositories.");
            return Ok(false);
        }
        Ok(true)
    }

    async fn update_repositories(&self, base_path: &Path) -> BurrowResult<bool> {
        let invocation = self.base_invocation(base_path, "--update");
        Ok(self.launcher.launch(&invocation).await?.success())
    }

    async fn clean_up(&self, base_path: &Path) -> BurrowResult<bool> {
        let invocation = self.base_invocation(base_path, "--clean");
        Ok(self.launcher.launch(&invocation).await?.success())
    }

    async fn health_check(&self) -> bool {
        help_probe(self.launcher.as_ref(), &["sudo", TOOL], "--basepath").await
    }
}

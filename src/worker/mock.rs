//! Mock backend
//!
//! Drives the Fedora-style `mock` chroot builder. Mock keeps its own
//! configuration bundle next to the base environment: the system config for
//! the toolset plus a generated `site-defaults.cfg` pointing basedir and
//! cache at the managed location. Base environments are additionally keyed
//! by executor slot because mock cannot share a root between builds.

use crate::error::{BurrowError, BurrowResult};
use crate::launch::{CommandInvocation, Listener, ProcessLauncher};
use crate::script::ScriptFile;
use crate::toolset::{self, Node, Repository, Toolset};
use crate::worker::{help_probe, resolve_source_package, ChrootWorker, CommandRequest, PackageBuildRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

const TOOL: &str = "/usr/bin/mock";

const MANAGED_BEGIN: &str = "# --- burrow managed ---\n";
const MANAGED_END: &str = "# --- end burrow managed ---\n";

/// Chroot worker using mock
pub struct MockWorker {
    launcher: Arc<dyn ProcessLauncher>,
    listener: Arc<dyn Listener>,
    system_config_dir: PathBuf,
}

impl MockWorker {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, listener: Arc<dyn Listener>) -> Self {
        Self {
            launcher,
            listener,
            system_config_dir: PathBuf::from("/etc/mock"),
        }
    }

    /// Override the system config directory (normally `/etc/mock`).
    pub fn with_system_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system_config_dir = dir.into();
        self
    }

    /// Config name for a base path: the file name minus the executor
    /// suffix, matching the `.cfg` copied during setup.
    fn instance_name(base_path: &Path) -> BurrowResult<String> {
        base_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                BurrowError::Internal(format!("invalid base path {}", base_path.display()))
            })
    }

    /// `mock -r <cfg> --configdir <base>` prefix shared by all actions.
    fn base_invocation(base_path: &Path, instance: &str) -> CommandInvocation {
        CommandInvocation::new([TOOL])
            .arg("-r")
            .arg(instance)
            .arg("--configdir")
            .arg(base_path.display().to_string())
    }

    /// Rewrite the instance config with a managed header, replacing any
    /// header from a previous run so repeated builds do not accumulate
    /// duplicate lines.
    async fn rewrite_config(
        &self,
        base_path: &Path,
        instance: &str,
        header: &str,
    ) -> BurrowResult<()> {
        let cfg = base_path.join(format!("{instance}.cfg"));
        let existing = fs::read_to_string(&cfg)
            .await
            .map_err(|e| BurrowError::io(format!("reading {}", cfg.display()), e))?;
        let body = match existing.find(MANAGED_END) {
            Some(i) => &existing[i + MANAGED_END.len()..],
            None => existing.as_str(),
        };
        let content = format!("{MANAGED_BEGIN}{header}{MANAGED_END}{body}");
        fs::write(&cfg, content)
            .await
            .map_err(|e| BurrowError::io(format!("writing {}", cfg.display()), e))?;
        Ok(())
    }

    fn dirs_header(base_path: &Path) -> String {
        format!(
            "config_opts['basedir'] = '{}'\nconfig_opts['cache_topdir'] = '{}'\n",
            base_path.join("root").display(),
            base_path.join("cache").display(),
        )
    }
}

#[async_trait]
impl ChrootWorker for MockWorker {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn tool(&self) -> &'static str {
        TOOL
    }

    fn default_packages(&self) -> &'static [&'static str] {
        &[]
    }

    fn fallback_packages(&self) -> &'static [&'static str] {
        &[]
    }

    fn base_path(&self, toolset: &Toolset, node: &Node) -> PathBuf {
        node.root.join(self.name()).join(format!(
            "{}-{}.{}",
            toolset.name,
            toolset.package_digest(),
            node.executor
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
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| BurrowError::io(format!("creating {}", base_path.display()), e))?;

        let instance = Self::instance_name(&base_path)?;
        let system_cfg = self.system_config_dir.join(format!("{}.cfg", toolset.name));
        let system_logging = self.system_config_dir.join("logging.ini");
        let instance_cfg = base_path.join(format!("{instance}.cfg"));

        fs::copy(&system_cfg, &instance_cfg).await.map_err(|e| {
            BurrowError::io(
                format!("copying {} to {}", system_cfg.display(), instance_cfg.display()),
                e,
            )
        })?;
        fs::copy(&system_logging, base_path.join("logging.ini"))
            .await
            .map_err(|e| BurrowError::io(format!("copying {}", system_logging.display()), e))?;
        fs::write(base_path.join("site-defaults.cfg"), Self::dirs_header(&base_path))
            .await
            .map_err(|e| BurrowError::io("writing site-defaults.cfg", e))?;

        let invocation = Self::base_invocation(&base_path, &instance)
            .arg("--resultdir")
            .arg(base_path.join("result").display().to_string())
            .arg("--init");
        if !self.launcher.launch(&invocation).await?.success() {
            self.listener.fatal("Could not setup chroot environment");
            return Err(BurrowError::SetupFailed(toolset.name.clone()));
        }

        Ok(base_path)
    }

    async fn run_command(&self, request: &CommandRequest) -> BurrowResult<bool> {
        if !request.bind_mounts.trim().is_empty() {
            self.listener
                .fatal("***Bind mounts not supported by Mock***");
            return Err(BurrowError::BindMountsUnsupported);
        }

        let instance = Self::instance_name(&request.base_path)?;
        let commands = format!("cd {}\n{}", request.workspace.display(), request.commands);
        let run_script = ScriptFile::create(&request.workspace, &commands).await?;

        // expose the workspace inside the chroot via mock's bind-mount plugin
        let header = format!(
            "{}config_opts['plugin_conf']['bind_mount_enable'] = True\n\
             config_opts['plugin_conf']['bind_mount_opts']['dirs'].append(('{}', '{}' ))\n",
            Self::dirs_header(&request.base_path),
            request.workspace.display(),
            request.workspace.display(),
        );
        self.rewrite_config(&request.base_path, &instance, &header)
            .await?;

        let invocation = Self::base_invocation(&request.base_path, &instance)
            .arg("--resultdir")
            .arg(request.workspace.join("result").display().to_string())
            .arg("--chroot")
            .arg("/bin/sh")
            .arg(run_script.path().display().to_string());

        let result = self.launcher.launch(&invocation).await?;
        Ok(result.success())
    }

    async fn build_package(&self, request: &PackageBuildRequest) -> BurrowResult<bool> {
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

        let instance = Self::instance_name(&request.base_path)?;
        self.rewrite_config(
            &request.base_path,
            &instance,
            &Self::dirs_header(&request.base_path),
        )
        .await?;

        let invocation = CommandInvocation::new([TOOL])
            .arg("-v")
            .arg("-r")
            .arg(&instance)
            .arg("--configdir")
            .arg(request.base_path.display().to_string())
            .arg("--resultdir")
            .arg(request.workspace.join("result").display().to_string())
            .arg("--rebuild")
            .arg(source.display().to_string());

        let result = self.launcher.launch(&invocation).await?;
        Ok(result.success())
    }

    async fn install_packages(
        &self,
        _base_path: &Path,
        _packages: &[String],
        _force_install: bool,
    ) -> BurrowResult<bool> {
        Err(BurrowError::Unsupported {
            backend: "mock",
            operation: "install packages",
        })
    }

    async fn add_repositories(
        &self,
        _base_path: &Path,
        repositories: &[Repository],
    ) -> BurrowResult<bool> {
        if repositories.is_empty() {
            return Ok(true);
        }
        Err(BurrowError::Unsupported {
            backend: "mock",
            operation: "add repositories",
        })
    }

    async fn update_repositories(&self, base_path: &Path) -> BurrowResult<bool> {
        let instance = Self::instance_name(base_path)?;
        let invocation = Self::base_invocation(base_path, &instance).arg("--update");
        Ok(self.launcher.launch(&invocation).await?.success())
    }

    async fn clean_up(&self, _base_path: &Path) -> BurrowResult<bool> {
        Err(BurrowError::Unsupported {
            backend: "mock",
            operation: "clean up",
        })
    }

    async fn health_check(&self) -> bool {
        help_probe(self.launcher.as_ref(), &[TOOL], "--scm-enable").await
    }
}

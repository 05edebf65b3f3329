//! Subcommand implementations.

mod build;
mod clean;
mod list;
mod run;
mod setup;
mod status;
mod update;

pub use build::execute as build;
pub use clean::execute as clean;
pub use list::execute as list;
pub use run::execute as run;
pub use setup::execute as setup;
pub use status::execute as status;
pub use update::execute as update;

use crate::cli::args::Cli;
use crate::config::ToolsetRegistry;
use crate::error::{BurrowError, BurrowResult};
use crate::launch::{ConsoleListener, Listener, LocalLauncher, ProcessLauncher};
use crate::toolset::{Node, Toolset};
use crate::worker::{create_worker, ChrootWorker};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared command context: loaded registry, node identity and the
/// launcher/listener pair handed to every worker.
pub struct Context {
    pub registry: ToolsetRegistry,
    pub node: Node,
    pub launcher: Arc<dyn ProcessLauncher>,
    pub listener: Arc<dyn Listener>,
}

impl Context {
    pub async fn from_cli(cli: &Cli) -> BurrowResult<Self> {
        let registry_path = cli
            .registry
            .clone()
            .unwrap_or_else(ToolsetRegistry::default_path);
        let registry = ToolsetRegistry::load(&registry_path).await?;

        let root = cli.node_root.clone().unwrap_or_else(default_node_root);
        let node = Node::new(root).with_executor(cli.executor);

        let listener: Arc<dyn Listener> = Arc::new(ConsoleListener);
        let launcher: Arc<dyn ProcessLauncher> =
            Arc::new(LocalLauncher::new(listener.clone()));
        Ok(Self {
            registry,
            node,
            launcher,
            listener,
        })
    }

    /// Worker for an already-resolved toolset.
    pub fn worker(&self, toolset: &Toolset) -> Box<dyn ChrootWorker> {
        create_worker(toolset.backend, self.launcher.clone(), self.listener.clone())
    }

    /// Resolve a toolset and fail fast if its backend tool is unusable.
    pub async fn ready_worker(
        &self,
        name: &str,
    ) -> BurrowResult<(Toolset, Box<dyn ChrootWorker>)> {
        let toolset = self.registry.resolve(name)?;
        let worker = self.worker(&toolset);
        if !worker.health_check().await {
            self.listener.fatal(&format!(
                "Backend tool {} is not usable on this node.",
                worker.tool()
            ));
            return Err(BurrowError::BackendUnavailable {
                name: worker.name(),
            });
        }
        Ok((toolset, worker))
    }
}

/// Default node root for cached base environments.
fn default_node_root() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("burrow")
}

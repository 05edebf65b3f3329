//! Build command - build a source package inside a toolset's environment

use super::Context;
use crate::cli::args::{ArchAllBehaviour, BuildArgs};
use crate::error::{BurrowError, BurrowResult};
use crate::worker::{ArchPolicy, PackageBuildRequest};

/// Execute the build command
pub async fn execute(args: BuildArgs, ctx: &Context) -> BurrowResult<()> {
    let (toolset, worker) = ctx.ready_worker(&args.toolset).await?;
    let base_path = worker.set_up(&toolset, &ctx.node).await?;

    let workspace = match args.workspace {
        Some(workspace) => workspace,
        None => std::env::current_dir()
            .map_err(|e| BurrowError::io("getting current directory", e))?,
    };

    if !args.no_update && !worker.update_repositories(&base_path).await? {
        ctx.listener
            .fatal("Updating repository indices in chroot environment failed.");
        if args.ignore_exit {
            return Ok(());
        }
        return Err(BurrowError::Failure("repository update failed".to_string()));
    }

    let arch_policy = match (args.arch_all_behaviour, args.arch_all_label) {
        (Some(ArchAllBehaviour::AllAndArch), _) => ArchPolicy::AllAndArch,
        (Some(ArchAllBehaviour::Arch), _) => ArchPolicy::ArchOnly,
        (None, Some(label)) => ArchPolicy::MatchLabel(label),
        (None, None) => ArchPolicy::Default,
    };

    let request = PackageBuildRequest {
        base_path,
        workspace,
        source_package: args.source_package,
        arch_policy,
        environment: std::env::vars().collect(),
    };

    if !worker.build_package(&request).await? {
        if args.ignore_exit {
            ctx.listener
                .log("Package build failed, but its exit code is ignored.");
        } else {
            ctx.listener.fatal("Package build failed.");
            return Err(BurrowError::Failure("package build failed".to_string()));
        }
    }
    Ok(())
}

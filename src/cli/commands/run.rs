//! Run command - execute commands inside a toolset's environment

use super::Context;
use crate::cli::args::RunArgs;
use crate::error::{BurrowError, BurrowResult};
use crate::util;
use crate::worker::CommandRequest;
use tokio::fs;

/// Execute the run command
pub async fn execute(args: RunArgs, ctx: &Context) -> BurrowResult<()> {
    let (toolset, worker) = ctx.ready_worker(&args.toolset).await?;
    let base_path = worker.set_up(&toolset, &ctx.node).await?;

    let workspace = match args.workspace {
        Some(workspace) => workspace,
        None => std::env::current_dir()
            .map_err(|e| BurrowError::io("getting current directory", e))?,
    };

    // packages from the command line plus any listed requirements files
    let mut packages = util::split_list(args.packages.as_deref().unwrap_or(""));
    for file in util::split_list(args.packages_file.as_deref().unwrap_or("")) {
        let path = workspace.join(&file);
        let is_file = fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            ctx.listener.fatal(&format!(
                "Requirements file '{file}' is not an existing file."
            ));
            return Err(BurrowError::PackagesFileMissing(path));
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| BurrowError::io(format!("reading {}", path.display()), e))?;
        packages.extend(util::split_list(&content));
    }

    if !packages.is_empty() {
        if !worker
            .install_packages(&base_path, &packages, args.force_install)
            .await?
        {
            ctx.listener
                .fatal("Installing additional packages in chroot environment failed.");
            return Err(BurrowError::Failure(
                "package installation failed".to_string(),
            ));
        }
    } else if !args.no_update
        && !worker.update_repositories(&base_path).await?
    {
        ctx.listener
            .fatal("Updating repository indices in chroot environment failed.");
        return Err(BurrowError::Failure("repository update failed".to_string()));
    }

    let request = CommandRequest {
        base_path,
        workspace,
        commands: args.command,
        environment: std::env::vars().collect(),
        bind_mounts: args.bind_mounts.unwrap_or_default(),
        run_as_root: args.login_as_root,
    };

    if !worker.run_command(&request).await? {
        if args.ignore_exit {
            ctx.listener
                .log("Command failed, but its exit code is ignored.");
        } else {
            ctx.listener.fatal("Command failed.");
            return Err(BurrowError::Failure(
                "command failed inside the chroot environment".to_string(),
            ));
        }
    }
    Ok(())
}

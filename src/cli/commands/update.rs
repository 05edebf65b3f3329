//! Update command - re-synchronize package indices

use super::Context;
use crate::cli::args::UpdateArgs;
use crate::error::{BurrowError, BurrowResult};
use console::style;

/// Execute the update command
pub async fn execute(args: UpdateArgs, ctx: &Context) -> BurrowResult<()> {
    let (toolset, worker) = ctx.ready_worker(&args.toolset).await?;
    let base_path = worker.set_up(&toolset, &ctx.node).await?;

    if !worker.update_repositories(&base_path).await? {
        ctx.listener
            .fatal("Updating repository indices in chroot environment failed.");
        return Err(BurrowError::Failure("repository update failed".to_string()));
    }
    println!("{} repository indices updated", style("✓").green());
    Ok(())
}

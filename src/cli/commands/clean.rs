//! Clean command - tear down backend caches for an environment

use super::Context;
use crate::cli::args::CleanArgs;
use crate::error::{BurrowError, BurrowResult};
use console::style;

/// Execute the clean command
pub async fn execute(args: CleanArgs, ctx: &Context) -> BurrowResult<()> {
    let (toolset, worker) = ctx.ready_worker(&args.toolset).await?;
    let base_path = worker.base_path(&toolset, &ctx.node);

    if !worker.clean_up(&base_path).await? {
        ctx.listener.fatal("Cleaning chroot environment failed.");
        return Err(BurrowError::Failure("clean up failed".to_string()));
    }
    println!(
        "{} cleaned caches for {}",
        style("✓").green(),
        base_path.display()
    );
    Ok(())
}

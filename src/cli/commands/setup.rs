//! Setup command - create or refresh a base environment

use super::Context;
use crate::cli::args::SetupArgs;
use crate::error::BurrowResult;
use console::style;

/// Execute the setup command
pub async fn execute(args: SetupArgs, ctx: &Context) -> BurrowResult<()> {
    let (toolset, worker) = ctx.ready_worker(&args.toolset).await?;
    let base_path = worker.set_up(&toolset, &ctx.node).await?;
    println!(
        "{} base environment ready at {}",
        style("✓").green(),
        base_path.display()
    );
    Ok(())
}

//! Status command - probe backend tool availability

use super::Context;
use crate::cli::args::StatusArgs;
use crate::error::BurrowResult;
use console::style;

/// Execute the status command
pub async fn execute(args: StatusArgs, ctx: &Context) -> BurrowResult<()> {
    let names: Vec<String> = match args.toolset {
        Some(name) => vec![name],
        None => ctx.registry.list().iter().map(|s| s.to_string()).collect(),
    };

    for name in names {
        let toolset = match ctx.registry.resolve(&name) {
            Ok(toolset) => toolset,
            Err(e) => {
                println!("{} {name}: {e}", style("✗").red());
                continue;
            }
        };
        let worker = ctx.worker(&toolset);
        if worker.health_check().await {
            println!(
                "{} {name}: {} available",
                style("✓").green(),
                worker.tool()
            );
        } else {
            println!(
                "{} {name}: {} not usable",
                style("✗").red(),
                worker.tool()
            );
        }
    }
    Ok(())
}

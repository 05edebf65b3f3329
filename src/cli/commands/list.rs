//! List command - show configured toolsets

use super::Context;
use crate::error::BurrowResult;

/// Execute the list command
pub async fn execute(ctx: &Context) -> BurrowResult<()> {
    let names = ctx.registry.list();
    if names.is_empty() {
        println!(
            "No toolsets configured in {}",
            ctx.registry.path().display()
        );
        return Ok(());
    }
    for name in names {
        match ctx.registry.resolve(name) {
            Ok(toolset) => println!("{name} ({})", toolset.backend.name()),
            Err(e) => println!("{name} (invalid: {e})"),
        }
    }
    Ok(())
}

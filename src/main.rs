//! burrow - reproducible package builds inside managed chroot environments
//!
//! CLI entry point that dispatches to subcommands.

use burrow::cli::commands::Context;
use burrow::cli::{Cli, Commands};
use burrow::error::BurrowResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BurrowResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("burrow=warn"),
        1 => EnvFilter::new("burrow=info"),
        _ => EnvFilter::new("burrow=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let ctx = Context::from_cli(&cli).await?;

    match cli.command {
        Commands::List => burrow::cli::commands::list(&ctx).await,
        Commands::Status(args) => burrow::cli::commands::status(args, &ctx).await,
        Commands::Setup(args) => burrow::cli::commands::setup(args, &ctx).await,
        Commands::Run(args) => burrow::cli::commands::run(args, &ctx).await,
        Commands::Build(args) => burrow::cli::commands::build(args, &ctx).await,
        Commands::Update(args) => burrow::cli::commands::update(args, &ctx).await,
        Commands::Clean(args) => burrow::cli::commands::clean(args, &ctx).await,
    }
}

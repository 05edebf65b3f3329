//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// burrow - reproducible package builds inside managed chroot environments
///
/// Resolves a named toolset from the registry, keeps its cached base
/// environment current, and runs commands or package builds inside it via
/// the configured backend tool (cowbuilder or mock).
#[derive(Parser, Debug)]
#[command(name = "burrow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Toolset registry path
    #[arg(short, long, global = true, env = "BURROW_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Node-local root directory for cached base environments
    #[arg(long, global = true, env = "BURROW_NODE_ROOT")]
    pub node_root: Option<PathBuf>,

    /// Executor slot number, keeping per-slot environments disjoint
    #[arg(long, global = true, env = "BURROW_EXECUTOR", default_value_t = 0)]
    pub executor: u32,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured toolsets
    List,

    /// Check backend tool availability
    Status(StatusArgs),

    /// Create or refresh a toolset's base environment
    Setup(SetupArgs),

    /// Run commands inside a toolset's environment
    Run(RunArgs),

    /// Build a source package inside a toolset's environment
    Build(BuildArgs),

    /// Re-synchronize package indices inside an environment
    Update(UpdateArgs),

    /// Clean backend caches for an environment
    Clean(CleanArgs),
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Check a single toolset instead of all
    pub toolset: Option<String>,
}

/// Arguments for the setup command
#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Toolset name
    pub toolset: String,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Toolset name
    pub toolset: String,

    /// Shell commands to run inside the environment
    #[arg(short, long)]
    pub command: String,

    /// Workspace directory (defaults to the current directory)
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// Extra packages to install first (commas, semicolons or whitespace)
    #[arg(long)]
    pub packages: Option<String>,

    /// Files inside the workspace listing further packages
    #[arg(long)]
    pub packages_file: Option<String>,

    /// Extra bind-mount paths, space separated
    #[arg(long)]
    pub bind_mounts: Option<String>,

    /// Run the commands as root instead of the build user
    #[arg(long)]
    pub login_as_root: bool,

    /// Skip the repository index update
    #[arg(long)]
    pub no_update: bool,

    /// Allow untrusted packages when installing
    #[arg(long)]
    pub force_install: bool,

    /// Treat a failing command as a warning instead of a failure
    #[arg(long)]
    pub ignore_exit: bool,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Toolset name
    pub toolset: String,

    /// Source package glob, resolved against the workspace after
    /// environment variable expansion; must match exactly one file
    pub source_package: String,

    /// Workspace directory (defaults to the current directory)
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// Explicit arch-all behaviour, overriding the label match
    #[arg(long, value_enum)]
    pub arch_all_behaviour: Option<ArchAllBehaviour>,

    /// Legacy label: build all binaries iff this label appears among the
    /// build environment's values
    #[arg(long)]
    pub arch_all_label: Option<String>,

    /// Skip the repository index update
    #[arg(long)]
    pub no_update: bool,

    /// Treat a failing build as a warning instead of a failure
    #[arg(long)]
    pub ignore_exit: bool,
}

/// Explicit arch-all behaviour selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchAllBehaviour {
    /// Build architecture-independent and architecture-specific binaries
    AllAndArch,
    /// Build architecture-specific binaries only
    Arch,
}

/// Arguments for the update command
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Toolset name
    pub toolset: String,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Toolset name
    pub toolset: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_args_parse() {
        let cli = Cli::parse_from([
            "burrow", "run", "sid", "-c", "make all", "--packages", "gcc, make",
            "--ignore-exit",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.toolset, "sid");
                assert_eq!(args.command, "make all");
                assert!(args.ignore_exit);
                assert!(!args.login_as_root);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn build_args_parse_behaviour() {
        let cli = Cli::parse_from([
            "burrow",
            "build",
            "sid",
            "*.dsc",
            "--arch-all-behaviour",
            "all-and-arch",
        ]);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.arch_all_behaviour, Some(ArchAllBehaviour::AllAndArch));
            }
            _ => panic!("expected build"),
        }
    }
}

use brewkit::{Action, PackageSpec};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "brewcore")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Idempotent Homebrew formula reconciliation", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to ~/.config/brewcore/config.toml)
    #[arg(long, global = true, env = "BREWCORE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the brew batches a pass would run, without changing anything
    Plan(PlanArgs),

    /// Install formulae that are missing
    Install(ReconcileArgs),

    /// Upgrade installed formulae and install pinned or missing ones
    Upgrade(ReconcileArgs),

    /// Uninstall formulae
    Remove(ReconcileArgs),

    /// Force-uninstall formulae, removing every installed version
    Purge(ReconcileArgs),

    /// Show what Homebrew knows about a formula
    Info {
        /// Formula name (e.g., git, node@20.11.1)
        formula: String,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the detected Homebrew owner, architecture and paths
    Host {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Reconciliation
// ============================================================================

#[derive(Parser)]
pub struct ReconcileArgs {
    /// Formulae as NAME or NAME=VERSION (defaults to the configured packages)
    #[arg(value_parser = parse_package)]
    pub packages: Vec<PackageSpec>,

    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Kind of pass to plan
    #[arg(short, long, value_enum, default_value = "upgrade")]
    pub action: ActionArg,

    /// Formulae as NAME or NAME=VERSION (defaults to the configured packages)
    #[arg(value_parser = parse_package)]
    pub packages: Vec<PackageSpec>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ActionArg {
    Install,
    Upgrade,
    Remove,
    Purge,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Install => Action::Install,
            ActionArg::Upgrade => Action::Upgrade,
            ActionArg::Remove => Action::Remove,
            ActionArg::Purge => Action::Purge,
        }
    }
}

/// Parse `name` or `name=version` into a spec.
pub fn parse_package(arg: &str) -> Result<PackageSpec, String> {
    match arg.split_once('=') {
        None if arg.trim().is_empty() => Err("package name cannot be empty".to_string()),
        None => Ok(PackageSpec::new(arg.trim())),
        Some((name, _)) if name.trim().is_empty() => {
            Err(format!("missing package name in '{arg}'"))
        }
        Some((_, version)) if version.trim().is_empty() => {
            Err(format!("missing version in '{arg}' (use NAME=VERSION)"))
        }
        Some((name, version)) => Ok(PackageSpec::pinned(name.trim(), version.trim())),
    }
}

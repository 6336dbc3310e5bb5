mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: config::Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "brewcore", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: config::Config::load(cli.config.as_deref())?,
    };

    match cli.command {
        Command::Plan(args) => commands::reconcile::plan(&ctx, args),
        Command::Install(args) => commands::reconcile::run(&ctx, brewkit::Action::Install, args),
        Command::Upgrade(args) => commands::reconcile::run(&ctx, brewkit::Action::Upgrade, args),
        Command::Remove(args) => commands::reconcile::run(&ctx, brewkit::Action::Remove, args),
        Command::Purge(args) => commands::reconcile::run(&ctx, brewkit::Action::Purge, args),
        Command::Info { formula, json } => commands::info::run(&ctx, &formula, json),
        Command::Host { json } => commands::host::run(&ctx, json),
        Command::Completions { .. } => Ok(()),
    }
}

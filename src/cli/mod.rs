//! Command-line interface for rulepatch
//!
//! `apply` is the default command, so a bare `rulepatch` runs the configured plan.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod apply;
mod restore;
mod rules;
mod utils;

/// Apply ordered pattern/replacement rules to text files, keeping backups of the originals
#[derive(Parser)]
#[command(name = "rulepatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    apply: apply::ApplyArgs,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the patch plan (default)
    Apply(apply::ApplyArgs),

    /// Move every backup back over its original
    Restore(restore::RestoreArgs),

    /// List the rules of the patch plan without touching any file
    Rules(rules::RulesArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command.unwrap_or(Commands::Apply(cli.apply)) {
        Commands::Apply(args) => apply::run(args, cli.verbose),
        Commands::Restore(args) => restore::run(args),
        Commands::Rules(args) => rules::run(args),
    }
}

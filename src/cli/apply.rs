//! Apply command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::utils::resolve_root;
use crate::config::load_config;
use crate::patch::{Orchestrator, PatchPlan, RunOptions};
use crate::render::{write_report, ConsoleReporter, Reporter, SilentReporter};

#[derive(Args, Debug, Default)]
pub struct ApplyArgs {
    /// Directory the plan's paths are relative to [default: the executable's directory]
    #[arg(short, long, value_name = "DIR", env = "RULEPATCH_ROOT")]
    pub root: Option<PathBuf>,

    /// Patch plan file (TOML or YAML) [default: rulepatch.toml in the root]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Evaluate every rule and report, but write nothing
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Apply rules to the backed-up original instead of the current content
    #[arg(long)]
    pub rebase: bool,

    /// Write a JSON execution report to this path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Omit the timestamp from the JSON report
    #[arg(long)]
    pub no_timestamp: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn run(args: ApplyArgs, verbose: bool) -> Result<()> {
    let root = resolve_root(args.root.as_deref())?;
    let config = load_config(&root, args.config.as_deref())?;
    let plan = PatchPlan::from_config(&config, &root).context("Invalid rule set")?;
    let options = RunOptions { dry_run: args.dry_run, rebase: args.rebase };

    tracing::debug!(root = %root.display(), ?options, "starting run");

    let mut silent = SilentReporter;
    let mut console = ConsoleReporter::stdout(root.clone(), verbose);
    let reporter: &mut dyn Reporter = if args.quiet { &mut silent } else { &mut console };

    // Preflight failures propagate and end the process with a non-zero status.
    let report = Orchestrator::new(plan, options, reporter).run()?;

    if let Some(report_path) = &args.report {
        let report_path = if report_path.is_absolute() {
            report_path.clone()
        } else {
            std::env::current_dir()?.join(report_path)
        };
        write_report(&report_path, &root, &report, !args.no_timestamp)?;
        if !args.quiet {
            println!("Report: {}", report_path.display());
        }
    }

    Ok(())
}

//! Rules command implementation

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use super::utils::resolve_root;
use crate::config::load_config;
use crate::domain::RuleKind;
use crate::patch::PatchPlan;
use crate::rules::{RuleScope, RuleSet};
use crate::utils::display_relative;

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Directory the plan's paths are relative to [default: the executable's directory]
    #[arg(short, long, value_name = "DIR", env = "RULEPATCH_ROOT")]
    pub root: Option<PathBuf>,

    /// Patch plan file (TOML or YAML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn run(args: RulesArgs) -> Result<()> {
    let root = resolve_root(args.root.as_deref())?;
    let config = load_config(&root, args.config.as_deref())?;
    // Compiling the plan validates every pattern before anything is listed.
    let plan = PatchPlan::from_config(&config, &root).context("Invalid rule set")?;

    print_set(&format!("entry {}", display_relative(&root, &plan.entry.path)), &plan.entry.rules);
    if let Some(batch) = &plan.batch {
        let label = format!("batch {}/*{}", display_relative(&root, &batch.dir), batch.include_ext);
        print_set(&label, &batch.rules);
    }

    println!("Backup suffix: {}", plan.backups.suffix());
    if let Some(edit) = &plan.descriptor {
        println!("Descriptor:    {} [{}]", display_relative(&root, &edit.path), edit.key);
    }
    if let Some(stub) = &plan.stub {
        println!("Artifact:      {}", display_relative(&root, &stub.path));
    }
    Ok(())
}

fn print_set(label: &str, rules: &RuleSet) {
    println!("{} ({} rule(s))", style(label).bold(), rules.len());
    for rule in rules.iter() {
        let kind = match rule.kind() {
            RuleKind::Exact => "exact",
            RuleKind::Pattern => "pattern",
        };
        let scope = match rule.scope() {
            RuleScope::Global => "*".to_string(),
            RuleScope::TargetedFile(name) => name.clone(),
        };
        let group = rule.group().map(|g| format!(" group={g}")).unwrap_or_default();
        println!("  {:<24} {:<8} {:<20} {}{group}", rule.id(), kind, scope, rule.matcher().as_str());
    }
    println!();
}

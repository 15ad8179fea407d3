//! Restore command implementation

use anyhow::Result;
use clap::Args;
use console::style;
use std::path::PathBuf;

use super::utils::resolve_root;
use crate::backup::BackupManager;
use crate::config::{discover_config, load_config};
use crate::utils::display_relative;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Directory to restore [default: the executable's directory]
    #[arg(short, long, value_name = "DIR", env = "RULEPATCH_ROOT")]
    pub root: Option<PathBuf>,

    /// Patch plan whose backup suffix to use
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backup suffix, overriding the plan
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Only restore backups directly inside the root
    #[arg(long)]
    pub no_recursive: bool,
}

pub fn run(args: RestoreArgs) -> Result<()> {
    let root = resolve_root(args.root.as_deref())?;

    let suffix = match args.suffix {
        Some(suffix) => suffix,
        None if args.config.is_some() || discover_config(&root).is_some() => {
            load_config(&root, args.config.as_deref())?.backup_suffix
        }
        None => BackupManager::default().suffix().to_string(),
    };
    if suffix.is_empty() {
        anyhow::bail!("Backup suffix must not be empty");
    }

    let restored = BackupManager::new(suffix.as_str()).restore(&root, !args.no_recursive);

    let mut failed = 0;
    for file in &restored {
        let shown = display_relative(&root, &file.original);
        match &file.error {
            None => println!("{} {shown}", style("restored").green()),
            Some(error) => {
                failed += 1;
                tracing::warn!(path = %file.original.display(), "restore failed: {error}");
                println!("{} {shown}: {error}", style("error").red().bold());
            }
        }
    }

    println!();
    println!("Restore complete!");
    println!("  Backups found:   {}", restored.len());
    println!("  Files restored:  {}", restored.len() - failed);
    if failed > 0 {
        println!("  Files failed:    {failed}");
    }
    Ok(())
}

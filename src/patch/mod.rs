//! Patch plans and the run that executes them

use crate::backup::BackupManager;
use crate::domain::Config;
use crate::error::RuleError;
use crate::rules::RuleSet;
use chrono::Utc;
use std::path::{Path, PathBuf};

pub mod descriptor;
pub mod orchestrator;
pub mod stub;

pub use descriptor::{rewrite_value, DescriptorEdit, Rewrite};
pub use orchestrator::Orchestrator;
pub use stub::{StubArtifact, StubData, StubResponse};

/// The file whose presence gates the run.
#[derive(Debug, Clone)]
pub struct EntryTarget {
    pub path: PathBuf,
    pub rules: RuleSet,
}

#[derive(Debug, Clone)]
pub struct BatchTarget {
    pub dir: PathBuf,
    pub include_ext: String,
    pub exclude_suffix: Option<String>,
    pub priority: Vec<String>,
    pub recursive: bool,
    pub rules: RuleSet,
}

/// A fully resolved patch plan: absolute paths and compiled rules.
#[derive(Debug, Clone)]
pub struct PatchPlan {
    pub root: PathBuf,
    pub entry: EntryTarget,
    pub batch: Option<BatchTarget>,
    pub descriptor: Option<DescriptorEdit>,
    pub stub: Option<StubArtifact>,
    pub backups: BackupManager,
}

impl PatchPlan {
    /// Compile every rule set and resolve relative paths against `root`.
    pub fn from_config(config: &Config, root: &Path) -> Result<Self, RuleError> {
        let entry = EntryTarget {
            path: resolve(root, &config.entry.path),
            rules: RuleSet::from_specs(&config.entry.rules)?,
        };

        let batch = match &config.batch {
            Some(batch) => Some(BatchTarget {
                dir: resolve(root, &batch.dir),
                include_ext: batch.include_ext.clone(),
                exclude_suffix: config.batch_exclude_suffix(),
                priority: batch.priority.clone(),
                recursive: batch.recursive,
                rules: RuleSet::from_specs(&batch.rules)?,
            }),
            None => None,
        };

        let descriptor = config.descriptor.as_ref().map(|d| DescriptorEdit {
            path: resolve(root, &d.path),
            key: d.key.clone(),
            value: d.value.clone(),
            expect: d.expect.clone(),
        });

        let now = Utc::now();
        let stub =
            config.stub.as_ref().map(|s| StubArtifact::from_config(s, resolve(root, &s.path), now));

        Ok(Self {
            root: root.to_path_buf(),
            entry,
            batch,
            descriptor,
            stub,
            backups: BackupManager::new(config.backup_suffix.clone()),
        })
    }
}

/// Switches that change how a plan is executed, not what it does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Evaluate everything, write nothing.
    pub dry_run: bool,
    /// Apply rules to the backup content when a backup exists.
    pub rebase: bool,
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

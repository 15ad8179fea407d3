//! Patch plan configuration
//!
//! All paths are relative to the run root unless absolute.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

pub const DEFAULT_BACKUP_SUFFIX: &str = ".bak";

fn default_backup_suffix() -> String {
    DEFAULT_BACKUP_SUFFIX.to_string()
}

fn default_stub_message() -> String {
    "success".to_string()
}

/// Days between a run and the `expireTime` it writes into the stub.
pub const DEFAULT_STUB_VALIDITY_DAYS: u32 = 365;

fn default_validity_days() -> u32 {
    DEFAULT_STUB_VALIDITY_DAYS
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    pub entry: EntryConfig,

    #[serde(default)]
    pub batch: Option<BatchConfig>,

    #[serde(default)]
    pub descriptor: Option<DescriptorConfig>,

    #[serde(default)]
    pub stub: Option<StubConfig>,
}

/// The single file whose presence gates the whole run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EntryConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    pub dir: PathBuf,
    /// Name suffix a file must carry, e.g. `.js`. Empty includes everything.
    #[serde(default)]
    pub include_ext: String,
    /// Name suffix that excludes a file. Defaults to the backup suffix.
    #[serde(default)]
    pub exclude_suffix: Option<String>,
    /// Basename globs tagging a file as priority.
    #[serde(default)]
    pub priority: Vec<String>,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// Single-key value substitution in a structured text file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorConfig {
    pub path: PathBuf,
    pub key: String,
    pub value: Value,
    /// Only rewrite when the current value equals this.
    #[serde(default)]
    pub expect: Option<Value>,
}

/// Static response document with a fixed shape.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StubConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub code: i64,
    #[serde(default = "default_stub_message")]
    pub message: String,
    #[serde(default)]
    pub data: StubDataConfig,
}

/// Values for the stub's `data` object. `expireTime` is derived at run time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StubDataConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub license: String,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
}

impl Default for StubDataConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            email: String::new(),
            username: String::new(),
            is_premium: false,
            license: String::new(),
            validity_days: DEFAULT_STUB_VALIDITY_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Literal text, never matched inside a larger identifier.
    Exact,
    #[default]
    Pattern,
}

/// One rule as written in a config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub id: String,
    #[serde(default)]
    pub kind: RuleKind,
    #[serde(rename = "match")]
    pub find: String,
    #[serde(default)]
    pub replace: String,
    /// Pattern rules only: insert `replace` verbatim instead of expanding `$n`.
    #[serde(default)]
    pub literal: bool,
    /// Restrict the rule to files with this basename.
    #[serde(default)]
    pub file: Option<String>,
    /// Substring the content must contain for the rule to be tried.
    #[serde(default)]
    pub requires: Option<String>,
    /// Alternates sharing a group: the first one that matches wins.
    #[serde(default)]
    pub group: Option<String>,
}

impl Config {
    /// Structural checks that do not touch the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.backup_suffix.is_empty() {
            bail!("backup_suffix must not be empty");
        }
        if self.entry.path.as_os_str().is_empty() {
            bail!("entry.path must not be empty");
        }
        check_rule_ids("entry", &self.entry.rules)?;

        if let Some(batch) = &self.batch {
            if batch.dir.as_os_str().is_empty() {
                bail!("batch.dir must not be empty");
            }
            check_rule_ids("batch", &batch.rules)?;
        }

        if let Some(descriptor) = &self.descriptor {
            if descriptor.key.trim().is_empty() {
                bail!("descriptor.key must not be empty");
            }
            if descriptor.value.is_object() || descriptor.value.is_array() {
                bail!("descriptor.value must be a string, number, boolean or null");
            }
        }

        if let Some(stub) = &self.stub {
            if stub.path.as_os_str().is_empty() {
                bail!("stub.path must not be empty");
            }
            if stub.data.validity_days == 0 {
                bail!("stub.data.validity_days must be at least 1");
            }
        }

        Ok(())
    }

    /// Suffix excluding files from the batch pass.
    pub fn batch_exclude_suffix(&self) -> Option<String> {
        let batch = self.batch.as_ref()?;
        Some(batch.exclude_suffix.clone().unwrap_or_else(|| self.backup_suffix.clone()))
    }
}

fn check_rule_ids(section: &str, rules: &[RuleSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        if rule.id.trim().is_empty() {
            bail!("{section}.rules contains a rule without an id");
        }
        if !seen.insert(rule.id.as_str()) {
            bail!("{section}.rules defines rule '{}' more than once", rule.id);
        }
    }
    Ok(())
}

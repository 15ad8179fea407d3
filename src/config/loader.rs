//! Config file loading

use crate::domain::Config;
use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File names tried, in order, when no config path is given.
pub const CONFIG_CANDIDATES: [&str; 6] = [
    "rulepatch.toml",
    ".rulepatch.toml",
    "rulepatch.yml",
    ".rulepatch.yml",
    "rulepatch.yaml",
    ".rulepatch.yaml",
];

/// Section name that may wrap the plan inside a shared config file.
const NESTED_SECTION: &str = "rulepatch";

/// Load and validate the patch plan.
///
/// A relative `config_path` is resolved against `root`. Unlike optional tool
/// settings, a plan is required, so a missing or malformed file is an error.
pub fn load_config(root: &Path, config_path: Option<&Path>) -> Result<Config> {
    let config_file = match config_path {
        Some(path) if path.is_relative() && !path.exists() => root.join(path),
        Some(path) => path.to_path_buf(),
        None => discover_config(root).ok_or_else(|| {
            anyhow!(
                "No patch plan found in {} (looked for {})",
                root.display(),
                CONFIG_CANDIDATES.join(", ")
            )
        })?,
    };

    let content = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;

    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    let config = match ext.as_str() {
        "toml" => parse_toml_config(&content, &config_file)?,
        "yaml" | "yml" => parse_yaml_config(&content, &config_file)?,
        other => bail!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        ),
    };

    config.validate().with_context(|| format!("Invalid patch plan: {}", config_file.display()))?;
    tracing::debug!(config = %config_file.display(), "loaded patch plan");
    Ok(config)
}

/// Parse TOML config, supporting a nested `[rulepatch]` section.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, supporting a nested `rulepatch` mapping.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

pub fn discover_config(root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES.iter().map(|candidate| root.join(candidate)).find(|path| path.is_file())
}

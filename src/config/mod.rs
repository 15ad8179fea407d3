//! Patch plan loading
//!
//! Plans live in `rulepatch.toml` (or YAML) at the run root, or at an explicit path.

pub mod loader;

pub use loader::{discover_config, load_config, CONFIG_CANDIDATES};

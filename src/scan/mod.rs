//! Batch file discovery

use crate::error::LocateError;
use std::path::Path;

pub mod locator;

pub use locator::{FileLocator, LocateStats, LocatedFile};

/// Single-level scan of `root` for files ending in `include_ext`, skipping `exclude_suffix`.
pub fn locate(
    root: &Path,
    include_ext: &str,
    exclude_suffix: &str,
    priority_patterns: &[String],
) -> Result<Vec<LocatedFile>, LocateError> {
    FileLocator::new(root.to_path_buf())
        .include_ext(include_ext)
        .exclude_suffix(Some(exclude_suffix.to_string()))
        .priority_patterns(priority_patterns.to_vec())
        .locate()
}

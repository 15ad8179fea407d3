//! Candidate file discovery for the batch pass

use crate::error::LocateError;
use crate::utils::{file_name_of, normalize_path};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file selected by the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub name: String,
    pub priority: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocateStats {
    pub entries_seen: usize,
    pub skipped_extension: usize,
    pub skipped_suffix: usize,
    pub included: usize,
    pub priority: usize,
}

/// Enumerates files under a directory, filtered and tagged by name.
pub struct FileLocator {
    root_path: PathBuf,
    include_ext: String,
    exclude_suffix: Option<String>,
    priority_patterns: Vec<String>,
    recursive: bool,
    stats: LocateStats,
}

impl FileLocator {
    /// Single-level locator that includes every file.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            include_ext: String::new(),
            exclude_suffix: None,
            priority_patterns: Vec::new(),
            recursive: false,
            stats: LocateStats::default(),
        }
    }

    /// Required name suffix (e.g. ".js"). Empty accepts every name.
    pub fn include_ext(mut self, ext: impl Into<String>) -> Self {
        self.include_ext = ext.into();
        self
    }

    /// Names ending with this suffix are skipped (e.g. backups).
    pub fn exclude_suffix(mut self, suffix: Option<String>) -> Self {
        self.exclude_suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    /// Basename globs that tag a file as priority.
    pub fn priority_patterns(mut self, patterns: Vec<String>) -> Self {
        self.priority_patterns = patterns;
        self
    }

    /// Walk the whole tree instead of only the top level.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn build_priority_globset(&self) -> Result<GlobSet, LocateError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.priority_patterns {
            let glob = Glob::new(pattern)
                .map_err(|source| LocateError::InvalidGlob { pattern: pattern.clone(), source })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|source| LocateError::InvalidGlob { pattern: self.priority_patterns.join(","), source })
    }

    fn accepts_name(&mut self, name: &str) -> bool {
        if !name.ends_with(self.include_ext.as_str()) {
            self.stats.skipped_extension += 1;
            return false;
        }
        if let Some(suffix) = &self.exclude_suffix {
            if name.ends_with(suffix.as_str()) {
                self.stats.skipped_suffix += 1;
                return false;
            }
        }
        true
    }

    /// Locate candidate files, sorted by relative path.
    ///
    /// A missing root is reported as [`LocateError::DirectoryMissing`] so the
    /// caller can decide to skip the pass.
    pub fn locate(&mut self) -> Result<Vec<LocatedFile>, LocateError> {
        self.stats = LocateStats::default();

        if !self.root_path.exists() {
            return Err(LocateError::DirectoryMissing(self.root_path.clone()));
        }
        if !self.root_path.is_dir() {
            return Err(LocateError::NotADirectory(self.root_path.clone()));
        }

        let priority = self.build_priority_globset()?;
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root_path).min_depth(1).max_depth(max_depth) {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            self.stats.entries_seen += 1;

            let path = entry.path();
            let name = file_name_of(path);
            if !self.accepts_name(&name) {
                continue;
            }

            let relative_path = relative_to(&self.root_path, path);
            let is_priority = priority.is_match(&name);
            if is_priority {
                self.stats.priority += 1;
            }
            self.stats.included += 1;
            files.push(LocatedFile {
                path: path.to_path_buf(),
                relative_path,
                name,
                priority: is_priority,
            });
        }

        // Sort by relative path for deterministic ordering
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        tracing::debug!(
            root = %self.root_path.display(),
            included = self.stats.included,
            "located batch files"
        );
        Ok(files)
    }

    pub fn stats(&self) -> &LocateStats {
        &self.stats
    }
}

fn relative_to(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => normalize_path(&rel.to_string_lossy()),
        Err(_) => normalize_path(&path.to_string_lossy()),
    }
}

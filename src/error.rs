//! Error types shared across the engine
//!
//! Only [`PreflightError`] is meant to reach the process boundary. Everything
//! else is caught at file granularity by the orchestrator and turned into a
//! reported outcome.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Validation failures that abort a run before any file is touched.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("entry target not found: {}", .0.display())]
    EntryMissing(PathBuf),

    #[error("entry target is not a regular file: {}", .0.display())]
    EntryNotFile(PathBuf),

    #[error("directory is not writable: {}", path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure creating a backup copy.
#[derive(Debug, Error)]
#[error("failed to write backup {}", path.display())]
pub struct BackupError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Per-file I/O failure. Fatal to that file only.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Backup(#[from] BackupError),
}

impl FileError {
    /// The path the failure is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            FileError::Read { path, .. } | FileError::Write { path, .. } => path,
            FileError::Backup(err) => &err.path,
        }
    }
}

/// Errors raised while building a rule set. These surface before any file is read.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule '{id}' has an empty matcher")]
    EmptyMatcher { id: String },

    #[error("rule id '{0}' is defined more than once")]
    DuplicateId(String),

    #[error("rule '{id}' has an invalid pattern")]
    InvalidPattern {
        id: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },

    #[error("rule '{id}' references group ${group}, but the pattern defines {available} capture group(s)")]
    UnknownGroup { id: String, group: usize, available: usize },
}

/// Batch directory enumeration failures.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("directory not found: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid priority pattern '{pattern}'")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

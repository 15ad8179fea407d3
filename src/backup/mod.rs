//! Original-preserving backups
//!
//! A backup is written at most once. Once present it is never overwritten, so
//! repeated runs always keep the true original.

use crate::domain::{BackupOutcome, DEFAULT_BACKUP_SUFFIX};
use crate::error::BackupError;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupManager {
    suffix: String,
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new(DEFAULT_BACKUP_SUFFIX)
    }
}

/// Result of restoring one backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredFile {
    pub original: PathBuf,
    pub error: Option<String>,
}

impl BackupManager {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self { suffix: suffix.into() }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// `path` with the backup suffix appended to its file name.
    pub fn backup_path(&self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(&self.suffix);
        PathBuf::from(name)
    }

    /// Content of the existing backup for `path`, if any.
    pub fn read_backup(&self, path: &Path) -> io::Result<Option<String>> {
        match fs::read_to_string(self.backup_path(path)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Persist `content` as the backup of `path` unless one already exists.
    pub fn ensure_backup(&self, path: &Path, content: &str) -> Result<BackupOutcome, BackupError> {
        let backup = self.backup_path(path);

        // create_new fails if the backup exists, including one created concurrently.
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&backup) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if !backup.is_file() {
                    let source = io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "backup path is taken by something other than a regular file",
                    );
                    return Err(BackupError { path: backup, source });
                }
                tracing::debug!(backup = %backup.display(), "backup already present");
                return Ok(BackupOutcome::AlreadyPresent(backup));
            }
            Err(source) => return Err(BackupError { path: backup, source }),
        };

        if let Err(source) = file.write_all(content.as_bytes()).and_then(|()| file.sync_all()) {
            drop(file);
            // A truncated backup would later be mistaken for the original.
            let _ = fs::remove_file(&backup);
            return Err(BackupError { path: backup, source });
        }

        tracing::debug!(backup = %backup.display(), "backup created");
        Ok(BackupOutcome::Created(backup))
    }

    /// Move every backup under `root` back over its original.
    pub fn restore(&self, root: &Path, recursive: bool) -> Vec<RestoredFile> {
        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut backups: Vec<PathBuf> = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.is_backup(path))
            .collect();
        backups.sort();

        backups
            .into_iter()
            .map(|backup| {
                let original = self.original_path(&backup);
                let error = fs::rename(&backup, &original).err().map(|e| e.to_string());
                RestoredFile { original, error }
            })
            .collect()
    }

    fn is_backup(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.len() > self.suffix.len() && name.ends_with(&self.suffix))
    }

    fn original_path(&self, backup: &Path) -> PathBuf {
        let raw = backup.to_string_lossy();
        PathBuf::from(raw.strip_suffix(self.suffix.as_str()).unwrap_or(&*raw))
    }
}

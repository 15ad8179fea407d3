//! Core data model shared by the engine, the orchestrator and the reporters

use crate::error::FileError;
use crate::utils::content_digest;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub mod config;

pub use config::{
    BatchConfig, Config, DescriptorConfig, EntryConfig, RuleKind, RuleSpec, StubConfig,
    StubDataConfig, DEFAULT_BACKUP_SUFFIX, DEFAULT_STUB_VALIDITY_DAYS,
};

/// Version of the JSON execution report layout.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preflight,
    Entry,
    Batch,
    Descriptor,
    Artifact,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preflight => "preflight",
            Stage::Entry => "entry",
            Stage::Batch => "batch",
            Stage::Descriptor => "descriptor",
            Stage::Artifact => "artifact",
        };
        f.write_str(name)
    }
}

/// A rule that matched, with the number of occurrences it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub id: String,
    pub occurrences: usize,
}

/// Per-file record of every rule evaluation.
///
/// Each effective rule lands in exactly one of the three lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub matched: Vec<RuleHit>,
    pub missed: Vec<String>,
    /// Alternates of an already-settled group; never evaluated.
    pub superseded: Vec<String>,
}

impl MatchReport {
    pub fn matched_ids(&self) -> Vec<String> {
        self.matched.iter().map(|hit| hit.id.clone()).collect()
    }

    pub fn total_occurrences(&self) -> usize {
        self.matched.iter().map(|hit| hit.occurrences).sum()
    }

    pub fn is_hit(&self, id: &str) -> bool {
        self.matched.iter().any(|hit| hit.id == id)
    }

    pub fn is_miss(&self, id: &str) -> bool {
        self.missed.iter().any(|missed| missed == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "path", rename_all = "snake_case")]
pub enum BackupOutcome {
    Created(PathBuf),
    AlreadyPresent(PathBuf),
}

impl BackupOutcome {
    pub fn path(&self) -> &Path {
        match self {
            BackupOutcome::Created(path) | BackupOutcome::AlreadyPresent(path) => path,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, BackupOutcome::Created(_))
    }
}

/// A file being patched. Owned by the orchestrator for the duration of one file.
#[derive(Debug, Clone)]
pub struct TargetFile {
    pub path: PathBuf,
    pub name: String,
    pub backup_path: PathBuf,
    pub priority: bool,
    /// Content as read from disk.
    pub original_content: String,
    /// Content after rule application.
    pub current_content: String,
    pub report: MatchReport,
}

impl TargetFile {
    pub fn new(path: PathBuf, backup_path: PathBuf, priority: bool) -> Self {
        let name = crate::utils::file_name_of(&path);
        Self {
            path,
            name,
            backup_path,
            priority,
            original_content: String::new(),
            current_content: String::new(),
            report: MatchReport::default(),
        }
    }

    /// Read the file from disk. Non-UTF-8 content is a read failure.
    pub fn load(&mut self) -> Result<(), FileError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|source| FileError::Read { path: self.path.clone(), source })?;
        self.current_content = content.clone();
        self.original_content = content;
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.original_content != self.current_content
    }

    pub fn into_outcome(self, backup: Option<BackupOutcome>, written: bool) -> FileOutcome {
        FileOutcome {
            digest_before: Some(content_digest(&self.original_content)),
            digest_after: Some(content_digest(&self.current_content)),
            occurrences: self.report.total_occurrences(),
            matched: self.report.matched_ids(),
            missed: self.report.missed,
            superseded: self.report.superseded,
            path: self.path,
            priority: self.priority,
            backup,
            written,
            error: None,
        }
    }
}

/// What happened to one file during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub priority: bool,
    pub matched: Vec<String>,
    pub missed: Vec<String>,
    pub superseded: Vec<String>,
    pub occurrences: usize,
    pub backup: Option<BackupOutcome>,
    pub written: bool,
    pub digest_before: Option<String>,
    pub digest_after: Option<String>,
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn failed(path: PathBuf, priority: bool, error: String) -> Self {
        Self {
            path,
            priority,
            matched: Vec::new(),
            missed: Vec::new(),
            superseded: Vec::new(),
            occurrences: 0,
            backup: None,
            written: false,
            digest_before: None,
            digest_after: None,
            error: Some(error),
        }
    }

    pub fn file_name(&self) -> String {
        crate::utils::file_name_of(&self.path)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DescriptorOutcome {
    Rewritten { key: String, previous: String },
    /// A dry run found a value to rewrite.
    WouldRewrite { key: String, previous: String },
    AlreadySet { key: String },
    KeyNotFound { key: String },
    UnexpectedValue { key: String, found: String },
    FileMissing { path: PathBuf },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Written { path: PathBuf },
    Unchanged { path: PathBuf },
    Planned { path: PathBuf },
    Failed { path: PathBuf, error: String },
}

/// Aggregate of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub dry_run: bool,
    pub files: Vec<FileOutcome>,
    pub skipped_stages: Vec<(Stage, String)>,
    pub descriptor: Option<DescriptorOutcome>,
    pub artifact: Option<ArtifactOutcome>,
}

impl ExecutionReport {
    pub fn files_written(&self) -> usize {
        self.files.iter().filter(|f| f.written).count()
    }

    pub fn files_failed(&self) -> usize {
        self.files.iter().filter(|f| f.is_error()).count()
    }

    pub fn rules_matched(&self) -> usize {
        self.files.iter().map(|f| f.matched.len()).sum()
    }

    pub fn rules_missed(&self) -> usize {
        self.files.iter().map(|f| f.missed.len()).sum()
    }

    /// Look up a file outcome by basename.
    pub fn outcome_for(&self, name: &str) -> Option<&FileOutcome> {
        self.files.iter().find(|f| f.file_name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn target_file_tracks_modification() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("app.js");
        fs::write(&path, "let a = 1;").expect("write");

        let mut target = TargetFile::new(path.clone(), tmp.path().join("app.js.bak"), false);
        target.load().expect("load");
        assert_eq!(target.name, "app.js");
        assert!(!target.is_modified());

        target.current_content = "let a = 2;".to_string();
        assert!(target.is_modified());
    }

    #[test]
    fn load_rejects_invalid_utf8() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("bin.js");
        fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).expect("write");

        let mut target = TargetFile::new(path, tmp.path().join("bin.js.bak"), false);
        assert!(matches!(target.load(), Err(FileError::Read { .. })));
    }

    #[test]
    fn outcome_carries_report_and_digests() {
        let mut target = TargetFile::new(PathBuf::from("a.js"), PathBuf::from("a.js.bak"), true);
        target.original_content = "x".into();
        target.current_content = "y".into();
        target.report.matched.push(RuleHit { id: "swap".into(), occurrences: 2 });
        target.report.missed.push("other".into());

        let outcome = target.into_outcome(None, true);
        assert_eq!(outcome.matched, vec!["swap".to_string()]);
        assert_eq!(outcome.missed, vec!["other".to_string()]);
        assert_eq!(outcome.occurrences, 2);
        assert!(outcome.priority);
        assert_ne!(outcome.digest_before, outcome.digest_after);
    }

    #[test]
    fn report_counts() {
        let mut report = ExecutionReport::default();
        report.files.push(FileOutcome {
            written: true,
            matched: vec!["a".into(), "b".into()],
            missed: vec!["c".into()],
            ..FileOutcome::failed(PathBuf::from("x/one.js"), false, String::new())
        });
        report.files.push(FileOutcome::failed(PathBuf::from("x/two.js"), false, "boom".into()));
        report.files[0].error = None;

        assert_eq!(report.files_written(), 1);
        assert_eq!(report.files_failed(), 1);
        assert_eq!(report.rules_matched(), 2);
        assert_eq!(report.rules_missed(), 1);
        assert!(report.outcome_for("two.js").is_some_and(FileOutcome::is_error));
    }
}

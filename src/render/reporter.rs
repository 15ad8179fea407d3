//! Reporter sink for run events
//!
//! The orchestrator emits events and never looks at what the reporter does
//! with them.

use crate::domain::{ArtifactOutcome, DescriptorOutcome, ExecutionReport, Stage};
use crate::utils::display_relative;
use console::style;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    FileLocated { path: PathBuf, priority: bool },
    BackupCreated { path: PathBuf },
    BackupSkipped { path: PathBuf },
    RuleMatched { file: String, rule: String, occurrences: usize },
    RuleMissed { file: String, rule: String },
    RuleSuperseded { file: String, rule: String },
    FileWritten { path: PathBuf },
    FileUnchanged { path: PathBuf },
    FileError { path: PathBuf, error: String },
    StageSkipped { stage: Stage, reason: String },
    PreflightFailed { reason: String },
    RunSummary(ExecutionReport),
}

pub trait Reporter {
    fn emit(&mut self, event: Event);
}

/// Drops every event.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn emit(&mut self, _event: Event) {}
}

/// Buffers events for later inspection.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Vec<Event>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }
}

impl Reporter for MemoryReporter {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Line-oriented progress text.
pub struct ConsoleReporter<W: Write> {
    out: W,
    root: PathBuf,
    verbose: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(root: PathBuf, verbose: bool) -> Self {
        Self::with_writer(io::stdout(), root, verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn with_writer(out: W, root: PathBuf, verbose: bool) -> Self {
        Self { out, root, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn rel(&self, path: &std::path::Path) -> String {
        display_relative(&self.root, path)
    }

    fn line(&mut self, text: String) {
        // Progress output is best effort; a closed stdout must not fail the run.
        let _ = writeln!(self.out, "{text}");
    }

    fn summary(&mut self, report: &ExecutionReport) {
        let heading = if report.dry_run { "Dry run complete!" } else { "Run complete!" };
        self.line(String::new());
        self.line(heading.to_string());
        self.line(format!("  Files processed: {}", report.files.len()));
        self.line(format!("  Files written:   {}", report.files_written()));
        self.line(format!("  Files failed:    {}", report.files_failed()));
        self.line(format!("  Rules matched:   {}", report.rules_matched()));
        self.line(format!("  Rules missed:    {}", report.rules_missed()));

        if let Some(descriptor) = &report.descriptor {
            let text = match descriptor {
                DescriptorOutcome::Rewritten { key, previous } => {
                    format!("{key} rewritten (was {previous})")
                }
                DescriptorOutcome::WouldRewrite { key, previous } => {
                    format!("{key} would be rewritten (is {previous})")
                }
                DescriptorOutcome::AlreadySet { key } => format!("{key} already set"),
                DescriptorOutcome::KeyNotFound { key } => format!("{key} not found"),
                DescriptorOutcome::UnexpectedValue { key, found } => {
                    format!("{key} left alone (found {found})")
                }
                DescriptorOutcome::FileMissing { path } => {
                    format!("{} missing", self.rel(path))
                }
                DescriptorOutcome::Failed { error } => format!("failed: {error}"),
            };
            self.line(format!("  Descriptor:      {text}"));
        }

        if let Some(artifact) = &report.artifact {
            let text = match artifact {
                ArtifactOutcome::Written { path } => format!("written {}", self.rel(path)),
                ArtifactOutcome::Unchanged { path } => format!("unchanged {}", self.rel(path)),
                ArtifactOutcome::Planned { path } => format!("would write {}", self.rel(path)),
                ArtifactOutcome::Failed { path, error } => {
                    format!("failed {}: {error}", self.rel(path))
                }
            };
            self.line(format!("  Artifact:        {text}"));
        }

        for (stage, reason) in &report.skipped_stages {
            self.line(format!("  Skipped {stage}: {reason}"));
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn emit(&mut self, event: Event) {
        match event {
            Event::FileLocated { path, priority } => {
                if self.verbose {
                    let tag = if priority { " (priority)" } else { "" };
                    let text = format!("found {}{tag}", self.rel(&path));
                    self.line(text);
                }
            }
            Event::BackupCreated { path } => {
                let text = format!("  backup created: {}", self.rel(&path));
                self.line(text);
            }
            Event::BackupSkipped { path } => {
                if self.verbose {
                    let text = format!("  backup kept: {}", self.rel(&path));
                    self.line(text);
                }
            }
            Event::RuleMatched { file, rule, occurrences } => {
                self.line(format!("  {} {rule} in {file} ({occurrences})", style("+").green()));
            }
            Event::RuleMissed { file, rule } => {
                self.line(format!("  {} {rule} not found in {file}", style("-").yellow()));
            }
            Event::RuleSuperseded { file, rule } => {
                if self.verbose {
                    self.line(format!("  = {rule} superseded in {file}"));
                }
            }
            Event::FileWritten { path } => {
                let text = format!("{} {}", style("patched").green().bold(), self.rel(&path));
                self.line(text);
            }
            Event::FileUnchanged { path } => {
                let text = format!("unchanged {}", self.rel(&path));
                self.line(text);
            }
            Event::FileError { path, error } => {
                let text = format!("{} {}: {error}", style("error").red().bold(), self.rel(&path));
                self.line(text);
            }
            Event::StageSkipped { stage, reason } => {
                self.line(format!("{} {stage}: {reason}", style("skipped").yellow()));
            }
            Event::PreflightFailed { reason } => {
                self.line(format!("{} {reason}", style("preflight failed:").red().bold()));
            }
            Event::RunSummary(report) => self.summary(&report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileOutcome;

    fn render(events: Vec<Event>, verbose: bool) -> String {
        let mut reporter = ConsoleReporter::with_writer(Vec::new(), PathBuf::from("/ext"), verbose);
        for event in events {
            reporter.emit(event);
        }
        String::from_utf8(reporter.into_inner()).expect("utf8")
    }

    #[test]
    fn paths_are_shown_relative_to_root() {
        let out = render(vec![Event::FileWritten { path: PathBuf::from("/ext/out/main.js") }], false);
        assert!(out.contains("out/main.js"));
        assert!(!out.contains("/ext/"));
    }

    #[test]
    fn quiet_events_need_verbose() {
        let events = || {
            vec![
                Event::FileLocated { path: PathBuf::from("/ext/a.js"), priority: true },
                Event::BackupSkipped { path: PathBuf::from("/ext/a.js.bak") },
            ]
        };
        assert!(render(events(), false).is_empty());
        let verbose = render(events(), true);
        assert!(verbose.contains("a.js (priority)"));
        assert!(verbose.contains("backup kept"));
    }

    #[test]
    fn summary_lists_counts_and_stages() {
        let mut report = ExecutionReport::default();
        let mut written = FileOutcome::failed(PathBuf::from("/ext/a.js"), false, String::new());
        written.error = None;
        written.written = true;
        written.matched = vec!["r1".into()];
        report.files.push(written);
        report.files.push(FileOutcome::failed(PathBuf::from("/ext/b.js"), false, "denied".into()));
        report.skipped_stages.push((Stage::Batch, "directory not found".into()));
        report.descriptor = Some(DescriptorOutcome::AlreadySet { key: "pricing".into() });

        let out = render(vec![Event::RunSummary(report)], false);
        assert!(out.contains("Run complete!"));
        assert!(out.contains("Files processed: 2"));
        assert!(out.contains("Files written:   1"));
        assert!(out.contains("Files failed:    1"));
        assert!(out.contains("pricing already set"));
        assert!(out.contains("Skipped batch: directory not found"));
    }

    #[test]
    fn memory_reporter_buffers_in_order() {
        let mut reporter = MemoryReporter::new();
        reporter.emit(Event::PreflightFailed { reason: "x".into() });
        reporter.emit(Event::FileUnchanged { path: PathBuf::from("a") });
        assert_eq!(reporter.events().len(), 2);
        assert_eq!(reporter.count(|e| matches!(e, Event::PreflightFailed { .. })), 1);
    }
}

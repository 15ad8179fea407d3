//! Stage sequencing for one run
//!
//! Preflight is the only stage that can abort. Every later failure is caught at
//! file granularity, reported, and the run moves on.

use crate::backup::BackupManager;
use crate::domain::{
    ArtifactOutcome, BackupOutcome, DescriptorOutcome, ExecutionReport, FileOutcome, Stage,
    TargetFile,
};
use crate::error::{FileError, LocateError, PreflightError};
use crate::patch::{BatchTarget, DescriptorEdit, PatchPlan, Rewrite, RunOptions, StubArtifact};
use crate::render::{Event, Reporter};
use crate::rules::{apply, RuleSet};
use crate::scan::FileLocator;
use crate::utils::write_atomic;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Orchestrator<'r> {
    plan: PatchPlan,
    options: RunOptions,
    reporter: &'r mut dyn Reporter,
}

impl<'r> Orchestrator<'r> {
    pub fn new(plan: PatchPlan, options: RunOptions, reporter: &'r mut dyn Reporter) -> Self {
        Self { plan, options, reporter }
    }

    /// Execute every configured stage in order.
    pub fn run(self) -> Result<ExecutionReport, PreflightError> {
        let Orchestrator { plan, options, reporter } = self;

        if let Err(err) = preflight(&plan.entry.path) {
            tracing::debug!("preflight failed: {err}");
            reporter.emit(Event::PreflightFailed { reason: describe(&err) });
            return Err(err);
        }

        let mut pass = FilePass { backups: &plan.backups, options, reporter };
        let mut report = ExecutionReport { dry_run: options.dry_run, ..Default::default() };

        report.files.push(pass.process(plan.entry.path.clone(), false, &plan.entry.rules));

        if let Some(batch) = &plan.batch {
            pass.batch(batch, &plan.entry.path, &mut report);
        }

        if let Some(edit) = &plan.descriptor {
            let outcome = pass.descriptor(edit, &mut report);
            report.descriptor = Some(outcome);
        }

        if let Some(stub) = &plan.stub {
            report.artifact = Some(pass.artifact(stub));
        }

        tracing::debug!(
            files = report.files.len(),
            written = report.files_written(),
            failed = report.files_failed(),
            "run finished"
        );
        pass.reporter.emit(Event::RunSummary(report.clone()));
        Ok(report)
    }
}

fn preflight(entry: &Path) -> Result<(), PreflightError> {
    if !entry.exists() {
        return Err(PreflightError::EntryMissing(entry.to_path_buf()));
    }
    if !entry.is_file() {
        return Err(PreflightError::EntryNotFile(entry.to_path_buf()));
    }
    let dir = entry.parent().unwrap_or(Path::new("."));
    crate::utils::probe_writable(dir)
        .map_err(|source| PreflightError::NotWritable { path: dir.to_path_buf(), source })
}

/// Error text with its source chain.
fn describe(err: &dyn Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

struct FilePass<'a, 'r> {
    backups: &'a BackupManager,
    options: RunOptions,
    reporter: &'r mut dyn Reporter,
}

impl FilePass<'_, '_> {
    fn process(&mut self, path: PathBuf, priority: bool, rules: &RuleSet) -> FileOutcome {
        match self.patch_target(path.clone(), priority, rules) {
            Ok(outcome) => outcome,
            Err(err) => {
                let error = describe(&err);
                tracing::warn!(path = %err.path().display(), "{error}");
                self.reporter.emit(Event::FileError { path: path.clone(), error: error.clone() });
                FileOutcome::failed(path, priority, error)
            }
        }
    }

    fn patch_target(
        &mut self,
        path: PathBuf,
        priority: bool,
        rules: &RuleSet,
    ) -> Result<FileOutcome, FileError> {
        let mut target = TargetFile::new(path.clone(), self.backups.backup_path(&path), priority);
        target.load()?;

        // The original is preserved before any rule runs, whether or not one matches.
        let backup = if self.options.dry_run {
            None
        } else {
            Some(self.backup(&target.path, &target.original_content)?)
        };

        let base = if self.options.rebase {
            self.backups
                .read_backup(&target.path)
                .map_err(|source| FileError::Read { path: target.backup_path.clone(), source })?
        } else {
            None
        };
        let base = base.as_deref().unwrap_or(&target.original_content);

        let applied = apply(base, rules, &target.name);
        for hit in &applied.report.matched {
            self.reporter.emit(Event::RuleMatched {
                file: target.name.clone(),
                rule: hit.id.clone(),
                occurrences: hit.occurrences,
            });
        }
        for id in &applied.report.missed {
            self.reporter.emit(Event::RuleMissed { file: target.name.clone(), rule: id.clone() });
        }
        for id in &applied.report.superseded {
            self.reporter
                .emit(Event::RuleSuperseded { file: target.name.clone(), rule: id.clone() });
        }
        target.current_content = applied.content;
        target.report = applied.report;

        if !target.is_modified() {
            self.reporter.emit(Event::FileUnchanged { path: target.path.clone() });
            return Ok(target.into_outcome(backup, false));
        }
        if self.options.dry_run {
            tracing::debug!(path = %target.path.display(), "dry run, not writing");
            return Ok(target.into_outcome(None, false));
        }

        write_atomic(&target.path, &target.current_content)
            .map_err(|source| FileError::Write { path: target.path.clone(), source })?;
        self.reporter.emit(Event::FileWritten { path: target.path.clone() });
        Ok(target.into_outcome(backup, true))
    }

    fn backup(&mut self, path: &Path, content: &str) -> Result<BackupOutcome, FileError> {
        let outcome = self.backups.ensure_backup(path, content)?;
        let event = match &outcome {
            BackupOutcome::Created(p) => Event::BackupCreated { path: p.clone() },
            BackupOutcome::AlreadyPresent(p) => Event::BackupSkipped { path: p.clone() },
        };
        self.reporter.emit(event);
        Ok(outcome)
    }

    fn skip(&mut self, stage: Stage, reason: String, report: &mut ExecutionReport) {
        tracing::debug!(%stage, "stage skipped: {reason}");
        self.reporter.emit(Event::StageSkipped { stage, reason: reason.clone() });
        report.skipped_stages.push((stage, reason));
    }

    fn batch(&mut self, batch: &BatchTarget, entry: &Path, report: &mut ExecutionReport) {
        let mut locator = FileLocator::new(batch.dir.clone())
            .include_ext(batch.include_ext.as_str())
            .exclude_suffix(batch.exclude_suffix.clone())
            .priority_patterns(batch.priority.clone())
            .recursive(batch.recursive);

        let files = match locator.locate() {
            Ok(files) => files,
            Err(LocateError::DirectoryMissing(dir)) => {
                let reason = format!("directory not found: {}", dir.display());
                self.skip(Stage::Batch, reason, report);
                return;
            }
            Err(err) => {
                tracing::warn!("batch pass skipped: {err}");
                self.skip(Stage::Batch, describe(&err), report);
                return;
            }
        };

        for file in files {
            if same_file(&file.path, entry) {
                tracing::debug!(path = %file.path.display(), "entry already patched");
                continue;
            }
            self.reporter.emit(Event::FileLocated { path: file.path.clone(), priority: file.priority });
            let outcome = self.process(file.path, file.priority, &batch.rules);
            report.files.push(outcome);
        }
    }

    fn descriptor(&mut self, edit: &DescriptorEdit, report: &mut ExecutionReport) -> DescriptorOutcome {
        if !edit.path.is_file() {
            let reason = format!("descriptor not found: {}", edit.path.display());
            self.skip(Stage::Descriptor, reason, report);
            return DescriptorOutcome::FileMissing { path: edit.path.clone() };
        }

        let content = match fs::read_to_string(&edit.path) {
            Ok(content) => content,
            Err(source) => {
                return self.descriptor_failed(FileError::Read { path: edit.path.clone(), source })
            }
        };

        let key = edit.key.clone();
        let rewrite = match edit.plan(&content) {
            Ok(rewrite) => rewrite,
            Err(err) => {
                tracing::warn!("descriptor rewrite failed: {err:#}");
                return DescriptorOutcome::Failed { error: format!("{err:#}") };
            }
        };

        match rewrite {
            Rewrite::AlreadySet => DescriptorOutcome::AlreadySet { key },
            Rewrite::KeyNotFound => {
                tracing::warn!(key = %key, path = %edit.path.display(), "descriptor key not found");
                DescriptorOutcome::KeyNotFound { key }
            }
            Rewrite::UnexpectedValue { found } => {
                tracing::warn!(key = %key, found = %found, "descriptor value differs from expectation");
                DescriptorOutcome::UnexpectedValue { key, found }
            }
            Rewrite::Changed { previous, .. } if self.options.dry_run => {
                DescriptorOutcome::WouldRewrite { key, previous }
            }
            Rewrite::Changed { content: updated, previous } => {
                let written = self.backup(&edit.path, &content).and_then(|_| {
                    write_atomic(&edit.path, &updated)
                        .map_err(|source| FileError::Write { path: edit.path.clone(), source })
                });
                match written {
                    Ok(()) => {
                        self.reporter.emit(Event::FileWritten { path: edit.path.clone() });
                        DescriptorOutcome::Rewritten { key, previous }
                    }
                    Err(err) => self.descriptor_failed(err),
                }
            }
        }
    }

    fn descriptor_failed(&mut self, err: FileError) -> DescriptorOutcome {
        let error = describe(&err);
        tracing::warn!("descriptor stage failed: {error}");
        self.reporter.emit(Event::FileError { path: err.path().to_path_buf(), error: error.clone() });
        DescriptorOutcome::Failed { error }
    }

    fn artifact(&mut self, stub: &StubArtifact) -> ArtifactOutcome {
        if self.options.dry_run {
            return ArtifactOutcome::Planned { path: stub.path.clone() };
        }
        match stub.write() {
            Ok(outcome) => {
                if let ArtifactOutcome::Written { path } = &outcome {
                    self.reporter.emit(Event::FileWritten { path: path.clone() });
                }
                outcome
            }
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!("artifact stage failed: {error}");
                self.reporter.emit(Event::FileError { path: stub.path.clone(), error: error.clone() });
                ArtifactOutcome::Failed { path: stub.path.clone(), error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Config;
    use crate::render::MemoryReporter;
    use tempfile::TempDir;

    const PLAN: &str = r#"
        [entry]
        path = "out/main.js"

        [[entry.rules]]
        id = "flag"
        match = 'enabled:\s*false'
        replace = "enabled:true"

        [batch]
        dir = "out/assets"
        include_ext = ".js"
        priority = ["connect-*.js"]

        [[batch.rules]]
        id = "label"
        kind = "exact"
        match = "Locked"
        replace = ""

        [descriptor]
        path = "package.json"
        key = "pricing"
        value = "Free"

        [stub]
        path = "mock/response.json"
        data = { id = "local", username = "dev", is_premium = true, license = "team" }
    "#;

    fn fixture() -> TempDir {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::create_dir_all(root.join("out/assets")).expect("mkdir");
        fs::write(root.join("out/main.js"), "var o={enabled: false};").expect("write");
        fs::write(root.join("out/assets/a.js"), "label('Locked')").expect("write");
        fs::write(root.join("out/assets/b.js"), "nothing here").expect("write");
        fs::write(root.join("out/assets/connect-x.js"), "x='Locked'").expect("write");
        fs::write(root.join("package.json"), "{\n  \"pricing\": \"Trial\"\n}\n").expect("write");
        tmp
    }

    fn plan(root: &Path, text: &str) -> PatchPlan {
        let cfg: Config = toml::from_str(text).expect("config");
        PatchPlan::from_config(&cfg, root).expect("plan")
    }

    fn run(
        root: &Path,
        text: &str,
        options: RunOptions,
    ) -> (Result<ExecutionReport, PreflightError>, MemoryReporter) {
        let mut reporter = MemoryReporter::new();
        let result = Orchestrator::new(plan(root, text), options, &mut reporter).run();
        (result, reporter)
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).expect("read")
    }

    #[test]
    fn full_run_patches_every_stage() {
        let tmp = fixture();
        let root = tmp.path();
        let (result, reporter) = run(root, PLAN, RunOptions::default());
        let report = result.expect("run");

        assert_eq!(read(root, "out/main.js"), "var o={enabled:true};");
        assert_eq!(read(root, "out/main.js.bak"), "var o={enabled: false};");
        assert_eq!(read(root, "out/assets/a.js"), "label('')");
        assert_eq!(read(root, "out/assets/b.js"), "nothing here");
        assert_eq!(read(root, "out/assets/b.js.bak"), "nothing here");
        assert!(read(root, "package.json").contains("\"pricing\": \"Free\""));
        assert!(root.join("package.json.bak").exists());
        let stub = read(root, "mock/response.json");
        assert!(stub.contains("\"license\": \"team\""));
        assert!(stub.contains("\"isPremium\": true"));
        assert!(stub.contains("\"expireTime\": "));

        assert_eq!(report.files.len(), 4);
        assert_eq!(report.files_written(), 3);
        assert!(report.outcome_for("connect-x.js").is_some_and(|f| f.priority && f.written));
        assert!(matches!(report.descriptor, Some(DescriptorOutcome::Rewritten { .. })));
        assert!(matches!(report.artifact, Some(ArtifactOutcome::Written { .. })));
        assert!(matches!(reporter.events().last(), Some(Event::RunSummary(_))));
    }

    #[test]
    fn missing_entry_aborts_before_any_write() {
        let tmp = fixture();
        let root = tmp.path();
        fs::remove_file(root.join("out/main.js")).expect("rm");

        let (result, reporter) = run(root, PLAN, RunOptions::default());

        assert!(matches!(result, Err(PreflightError::EntryMissing(_))));
        assert_eq!(reporter.events().len(), 1);
        assert!(matches!(reporter.events()[0], Event::PreflightFailed { .. }));
        assert_eq!(read(root, "out/assets/a.js"), "label('Locked')");
        assert!(!root.join("mock").exists());
        assert!(!root.join("package.json.bak").exists());
    }

    #[test]
    fn directory_as_entry_fails_preflight() {
        let tmp = fixture();
        let text = PLAN.replace("path = \"out/main.js\"", "path = \"out/assets\"");
        let (result, _) = run(tmp.path(), &text, RunOptions::default());
        assert!(matches!(result, Err(PreflightError::EntryNotFile(_))));
    }

    #[test]
    fn failing_batch_file_does_not_stop_the_others() {
        let tmp = fixture();
        let root = tmp.path();
        fs::write(root.join("out/assets/bad.js"), [0xff, 0xfe, b'L', 0xc3]).expect("write");

        let (result, reporter) = run(root, PLAN, RunOptions::default());
        let report = result.expect("run");

        assert!(report.outcome_for("bad.js").is_some_and(FileOutcome::is_error));
        assert_eq!(read(root, "out/assets/a.js"), "label('')");
        assert_eq!(read(root, "out/assets/connect-x.js"), "x=''");
        assert_eq!(reporter.count(|e| matches!(e, Event::FileError { .. })), 1);
        assert_eq!(report.files_failed(), 1);
    }

    #[test]
    fn failing_batch_backup_does_not_stop_the_others() {
        let tmp = fixture();
        let root = tmp.path();
        fs::create_dir(root.join("out/assets/a.js.bak")).expect("mkdir");

        let (result, reporter) = run(root, PLAN, RunOptions::default());
        let report = result.expect("run");

        assert!(report.outcome_for("a.js").is_some_and(FileOutcome::is_error));
        assert_eq!(read(root, "out/assets/a.js"), "label('Locked')");
        assert_eq!(read(root, "out/assets/connect-x.js"), "x=''");
        assert_eq!(read(root, "out/main.js"), "var o={enabled:true};");
        assert_eq!(reporter.count(|e| matches!(e, Event::FileError { .. })), 1);
        assert!(reporter.events().iter().any(|e| matches!(
            e,
            Event::FileError { path, .. } if path.ends_with("out/assets/a.js")
        )));
        assert_eq!(report.files_failed(), 1);
        assert_eq!(report.files_written(), 2);
    }

    #[test]
    fn backup_precedes_rule_application() {
        let tmp = fixture();
        let root = tmp.path();
        let (_, reporter) = run(root, PLAN, RunOptions::default());

        let events = reporter.events();
        let backup_at = events
            .iter()
            .position(|e| matches!(e, Event::BackupCreated { path } if path.ends_with("a.js.bak")))
            .expect("backup event");
        let matched_at = events
            .iter()
            .position(|e| matches!(e, Event::RuleMatched { file, .. } if file == "a.js"))
            .expect("match event");
        assert!(backup_at < matched_at);
    }

    #[test]
    fn unchanged_files_are_never_written() {
        let tmp = fixture();
        let root = tmp.path();
        run(root, PLAN, RunOptions::default()).0.expect("first");
        let (result, reporter) = run(root, PLAN, RunOptions::default());
        let report = result.expect("second");

        assert_eq!(report.files_written(), 0);
        assert_eq!(reporter.count(|e| matches!(e, Event::FileWritten { .. })), 0);
        assert_eq!(read(root, "out/main.js.bak"), "var o={enabled: false};");
        assert!(matches!(report.descriptor, Some(DescriptorOutcome::AlreadySet { .. })));
        assert!(matches!(report.artifact, Some(ArtifactOutcome::Unchanged { .. })));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = fixture();
        let root = tmp.path();
        let options = RunOptions { dry_run: true, ..RunOptions::default() };
        let (result, reporter) = run(root, PLAN, options);
        let report = result.expect("run");

        assert!(report.dry_run);
        assert_eq!(read(root, "out/main.js"), "var o={enabled: false};");
        assert!(!root.join("out/main.js.bak").exists());
        assert!(!root.join("mock").exists());
        assert!(matches!(report.descriptor, Some(DescriptorOutcome::WouldRewrite { .. })));
        assert!(matches!(report.artifact, Some(ArtifactOutcome::Planned { .. })));
        assert!(report.outcome_for("main.js").is_some_and(|f| f.matched == ["flag"]));
        assert_eq!(reporter.count(|e| matches!(e, Event::BackupCreated { .. })), 0);
    }

    #[test]
    fn missing_batch_directory_skips_the_stage() {
        let tmp = fixture();
        let root = tmp.path();
        fs::remove_dir_all(root.join("out/assets")).expect("rm");

        let (result, reporter) = run(root, PLAN, RunOptions::default());
        let report = result.expect("run");

        assert_eq!(report.files.len(), 1);
        assert_eq!(report.skipped_stages.len(), 1);
        assert_eq!(report.skipped_stages[0].0, Stage::Batch);
        assert_eq!(
            reporter.count(|e| matches!(e, Event::StageSkipped { stage: Stage::Batch, .. })),
            1
        );
    }

    #[test]
    fn entry_inside_batch_directory_is_patched_once() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::write(root.join("main.js"), "n=1").expect("write");
        fs::write(root.join("other.js"), "n=1").expect("write");
        let text = r#"
            [entry]
            path = "main.js"
            [[entry.rules]]
            id = "inc"
            match = 'n=(\d)'
            replace = "n=$1$1"
            [batch]
            dir = "."
            include_ext = ".js"
            [[batch.rules]]
            id = "inc"
            match = 'n=(\d)'
            replace = "n=$1$1"
        "#;

        let report = run(root, text, RunOptions::default()).0.expect("run");

        assert_eq!(report.files.len(), 2);
        assert_eq!(read(root, "main.js"), "n=11");
        assert_eq!(read(root, "other.js"), "n=11");
    }

    #[test]
    fn rebase_converges_for_non_idempotent_rules() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::write(root.join("main.js"), "v=1").expect("write");
        let text = r#"
            [entry]
            path = "main.js"
            [[entry.rules]]
            id = "wrap"
            match = 'v=(\w+)'
            replace = "v=f($1)"
        "#;
        let rebase = RunOptions { rebase: true, ..RunOptions::default() };

        run(root, text, rebase).0.expect("first");
        assert_eq!(read(root, "main.js"), "v=f(1)");
        let report = run(root, text, rebase).0.expect("second");
        assert_eq!(read(root, "main.js"), "v=f(1)");
        assert_eq!(report.files_written(), 0);

        run(root, text, RunOptions::default()).0.expect("third");
        assert_eq!(read(root, "main.js"), "v=f(f)(1)");
    }

    #[test]
    fn missing_descriptor_is_not_fatal() {
        let tmp = fixture();
        let root = tmp.path();
        fs::remove_file(root.join("package.json")).expect("rm");

        let report = run(root, PLAN, RunOptions::default()).0.expect("run");

        assert!(matches!(report.descriptor, Some(DescriptorOutcome::FileMissing { .. })));
        assert!(matches!(report.artifact, Some(ArtifactOutcome::Written { .. })));
    }
}

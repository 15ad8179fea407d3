//! Execution report JSON generation.

use crate::domain::{ExecutionReport, FileOutcome, REPORT_SCHEMA_VERSION};
use crate::utils::display_relative;
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::path::Path;

pub fn write_report(
    report_path: &Path,
    root_path: &Path,
    report: &ExecutionReport,
    include_timestamp: bool,
) -> Result<()> {
    let value = report_value(root_path, report, include_timestamp)?;

    if let Some(parent) = report_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(report_path, serde_json::to_string_pretty(&value)?)
        .with_context(|| format!("writing report {}", report_path.display()))?;
    Ok(())
}

pub fn report_value(
    root_path: &Path,
    report: &ExecutionReport,
    include_timestamp: bool,
) -> Result<Value> {
    let files = report.files.iter().map(|f| file_value(root_path, f)).collect::<Vec<_>>();

    let skipped = report
        .skipped_stages
        .iter()
        .map(|(stage, reason)| json!({ "stage": stage, "reason": reason }))
        .collect::<Vec<_>>();

    let mut out = Map::new();
    out.insert("schema_version".to_string(), Value::String(REPORT_SCHEMA_VERSION.to_string()));
    if include_timestamp {
        out.insert(
            "generated_at".to_string(),
            Value::String(Utc::now().format("%Y-%m-%dT%H:%M:%S+00:00").to_string()),
        );
    }
    out.insert("dry_run".to_string(), Value::Bool(report.dry_run));
    out.insert(
        "stats".to_string(),
        json!({
            "files_processed": report.files.len(),
            "files_written": report.files_written(),
            "files_failed": report.files_failed(),
            "rules_matched": report.rules_matched(),
            "rules_missed": report.rules_missed(),
        }),
    );
    out.insert("files".to_string(), Value::Array(files));
    if !skipped.is_empty() {
        out.insert("skipped_stages".to_string(), Value::Array(skipped));
    }
    if let Some(descriptor) = &report.descriptor {
        out.insert("descriptor".to_string(), serde_json::to_value(descriptor)?);
    }
    if let Some(artifact) = &report.artifact {
        out.insert("artifact".to_string(), serde_json::to_value(artifact)?);
    }
    Ok(Value::Object(out))
}

fn file_value(root_path: &Path, file: &FileOutcome) -> Value {
    let mut entry = json!({
        "path": display_relative(root_path, &file.path),
        "priority": file.priority,
        "matched": file.matched,
        "missed": file.missed,
        "occurrences": file.occurrences,
        "written": file.written,
    });
    if !file.superseded.is_empty() {
        entry["superseded"] = json!(file.superseded);
    }
    if let Some(backup) = &file.backup {
        entry["backup"] = json!({
            "path": display_relative(root_path, backup.path()),
            "created": backup.was_created(),
        });
    }
    if let (Some(before), Some(after)) = (&file.digest_before, &file.digest_after) {
        entry["sha256"] = json!({ "before": before, "after": after });
    }
    if let Some(error) = &file.error {
        entry["error"] = json!(error);
    }
    entry
}

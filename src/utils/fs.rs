//! Filesystem helpers: atomic writes and writability probes

use std::fs;
use std::io::{self, Write};
use std::path::Path;

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write `content` to a temporary sibling, then rename it over `path`.
///
/// Readers never observe a half-written file. Permissions of an existing file are kept.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let mut tmp =
        tempfile::Builder::new().prefix(".rulepatch-").suffix(".tmp").tempfile_in(parent_dir(path))?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create and immediately remove a temporary file in `dir`.
pub fn probe_writable(dir: &Path) -> io::Result<()> {
    let probe = tempfile::Builder::new().prefix(".rulepatch-probe-").tempfile_in(dir)?;
    probe.close()
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}

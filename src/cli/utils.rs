//! Shared CLI utilities.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// The run root: `explicit` when given, otherwise the directory holding the executable.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(path) => path
            .canonicalize()
            .with_context(|| format!("Root directory not found: {}", path.display()))?,
        None => {
            let exe = std::env::current_exe().context("Cannot locate the running executable")?;
            match exe.parent() {
                Some(dir) => dir.to_path_buf(),
                None => bail!("Executable has no parent directory: {}", exe.display()),
            }
        }
    };
    if !root.is_dir() {
        bail!("Root is not a directory: {}", root.display());
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_is_canonicalized() {
        let tmp = TempDir::new().expect("tmp");
        let root = resolve_root(Some(tmp.path())).expect("root");
        assert_eq!(root, tmp.path().canonicalize().expect("canon"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().expect("tmp");
        assert!(resolve_root(Some(&tmp.path().join("gone"))).is_err());
    }

    #[test]
    fn file_root_is_an_error() {
        let tmp = TempDir::new().expect("tmp");
        let file = tmp.path().join("f.txt");
        std::fs::write(&file, "x").expect("write");
        let err = resolve_root(Some(&file)).expect_err("file");
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn default_root_is_executable_directory() {
        let root = resolve_root(None).expect("root");
        let exe = std::env::current_exe().expect("exe");
        assert_eq!(Some(root.as_path()), exe.parent());
    }
}

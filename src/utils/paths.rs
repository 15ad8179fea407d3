//! Path normalization

use std::path::Path;

pub fn normalize_path(path: &str) -> String {
    // Convert backslashes to forward slashes and normalize
    path.replace('\\', "/")
}

/// `path` relative to `root` when possible, with forward slashes.
pub fn display_relative(root: &Path, path: &Path) -> String {
    let shown = path.strip_prefix(root).unwrap_or(path);
    normalize_path(&shown.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_inside_root() {
        let root = Path::new("/ext");
        assert_eq!(display_relative(root, Path::new("/ext/out/main.js")), "out/main.js");
    }

    #[test]
    fn absolute_outside_root() {
        let root = Path::new("/ext");
        assert_eq!(display_relative(root, Path::new("/other/a.js")), "/other/a.js");
    }

    #[test]
    fn backslashes_normalized() {
        assert_eq!(normalize_path(r"out\webview\a.js"), "out/webview/a.js");
    }
}

//! Source file discovery.

use anyhow::{Result, bail};
use sqlsift_core::extractor::Language;
use std::fs;
use std::path::{Path, PathBuf};

/// Directories never descended into.
pub const SKIP_DIRS: &[&str] = &[
    "target",
    "node_modules",
    ".git",
    "vendor",
    "__pycache__",
    "dist",
];

/// A file the controller will analyze.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourcePath {
    pub path: PathBuf,
    pub language: Language,
}

/// Collect analyzable files under `roots`, sorted and deduplicated.
///
/// A root that is a file is taken as is when its extension is known.
/// Unreadable directories are logged and skipped.
pub fn discover(roots: &[PathBuf], exclude: &[String]) -> Result<Vec<SourcePath>> {
    let mut found = Vec::new();
    for root in roots {
        if root.is_file() {
            match Language::from_path(root) {
                Some(language) => found.push(SourcePath {
                    path: root.clone(),
                    language,
                }),
                None => tracing::warn!(path = %root.display(), "unsupported file type, skipping"),
            }
        } else if root.is_dir() {
            walk(root, exclude, &mut found);
        } else {
            bail!("path not found: {}", root.display());
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

fn is_skipped(name: &str, exclude: &[String]) -> bool {
    SKIP_DIRS.contains(&name) || exclude.iter().any(|e| e == name)
}

fn walk(dir: &Path, exclude: &[String], found: &mut Vec<SourcePath>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(err) => {
            tracing::warn!(path = %dir.display(), "cannot read directory: {err}");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if is_skipped(name, exclude) {
                continue;
            }
            walk(&path, exclude, found);
        } else if file_type.is_file()
            && let Some(language) = Language::from_path(&path)
        {
            found.push(SourcePath { path, language });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_list() {
        assert!(is_skipped("node_modules", &[]));
        assert!(is_skipped("__pycache__", &[]));
        assert!(is_skipped("fixtures", &["fixtures".to_string()]));
        assert!(!is_skipped("src", &[]));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let err = discover(&[PathBuf::from("/nonexistent/sqlsift/root")], &[]).unwrap_err();
        assert!(err.to_string().contains("path not found"));
    }
}

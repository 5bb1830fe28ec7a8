//! Filesystem helpers. Removal is tolerant of absence and done in-process.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Delete `path` if it is a regular file. `Ok(false)` means nothing was there.
///
/// A directory with the same name is left alone.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => {
            fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Delete the directory tree at `path`. `Ok(false)` means there was none.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    fs::remove_dir_all(path).with_context(|| format!("failed to remove {}", path.display()))?;
    Ok(true)
}

/// Regular files in `dir` matching any of `patterns`, sorted and deduplicated.
///
/// `dir` is escaped, so only the patterns are interpreted as globs.
pub fn glob_files(dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let prefix = glob::Pattern::escape(&dir.to_string_lossy());
    let mut found = Vec::new();

    for pattern in patterns {
        let full = Path::new(&prefix).join(pattern);
        let entries = glob::glob(&full.to_string_lossy())
            .with_context(|| format!("invalid glob pattern `{}`", pattern))?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => found.push(path),
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping unreadable path: {}", e),
            }
        }
    }

    found.sort();
    found.dedup();
    Ok(found)
}

/// `path` relative to `base` for display, or `path` itself if there is no relation.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_file_if_exists() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("utility_mst.so");
        fs::write(&file, "stale").unwrap();

        assert!(remove_file_if_exists(&file).unwrap());
        assert!(!file.exists());
        assert!(!remove_file_if_exists(&file).unwrap());
    }

    #[test]
    fn test_remove_file_ignores_directories() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("utility_mst.so");
        fs::create_dir(&dir).unwrap();

        assert!(!remove_file_if_exists(&dir).unwrap());
        assert!(dir.exists());
    }

    #[test]
    fn test_remove_dir_all_if_exists() {
        let tmp = TempDir::new().unwrap();
        let bundle = tmp.path().join("utility_mst.so.dSYM");
        fs::create_dir_all(bundle.join("Contents/Resources")).unwrap();
        fs::write(bundle.join("Contents/Info.plist"), "plist").unwrap();

        assert!(remove_dir_all_if_exists(&bundle).unwrap());
        assert!(!bundle.exists());
        assert!(!remove_dir_all_if_exists(&bundle).unwrap());
    }

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("utility_mst.cpython-311-x86_64-linux-gnu.so"), "").unwrap();
        fs::write(tmp.path().join("utility_mst.cpython-312-x86_64-linux-gnu.so"), "").unwrap();
        fs::write(tmp.path().join("utility_mst.f90"), "").unwrap();

        let files = glob_files(tmp.path(), &["utility_mst.*.so".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_relative_path() {
        let rel = relative_path(Path::new("/project"), Path::new("/project/mistree/mst"));
        assert_eq!(rel, PathBuf::from("mistree/mst"));
    }
}

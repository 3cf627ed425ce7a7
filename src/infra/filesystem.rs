//! Filesystem operations
//!
//! Handles file and directory operations, the process working directory,
//! and glob-driven installation of build outputs.

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
///
/// A missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.is_dir() {
        tracing::info!("Removing folder \"{}\"", path.display());
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Copy a file, creating the destination's parent directories
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| FilesystemError::CopyFile {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e.to_string(),
        })
}

/// Current process working directory
pub fn current_dir() -> Result<PathBuf, FilesystemError> {
    std::env::current_dir().map_err(|e| FilesystemError::CurrentDir {
        error: e.to_string(),
    })
}

/// Change the process working directory
pub fn set_current_dir(path: &Path) -> Result<(), FilesystemError> {
    std::env::set_current_dir(path).map_err(|e| FilesystemError::ChangeDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remembers the working directory and restores it
///
/// Call [`WorkDirGuard::restore`] to observe restore failures; dropping the
/// guard restores on a best-effort basis.
#[derive(Debug)]
pub struct WorkDirGuard {
    original: PathBuf,
    restored: bool,
}

impl WorkDirGuard {
    /// Capture the current working directory
    pub fn acquire() -> Result<Self, FilesystemError> {
        Ok(Self {
            original: current_dir()?,
            restored: false,
        })
    }

    /// Directory that will be restored
    pub fn original(&self) -> &Path {
        &self.original
    }

    /// Restore the captured directory now
    pub fn restore(mut self) -> Result<(), FilesystemError> {
        self.restored = true;
        set_current_dir(&self.original)
    }
}

impl Drop for WorkDirGuard {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(e) = set_current_dir(&self.original) {
                tracing::warn!("{e}");
            }
        }
    }
}

/// Compile a glob pattern into a regex over `/`-separated relative paths
///
/// `*` and `?` stay within one path component, `**` spans components and
/// a leading `**/` also matches files at the top level.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, FilesystemError> {
    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    regex.push_str("(?:.*/)?");
                } else {
                    regex.push_str(".*");
                }
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            '\\' => regex.push('/'),
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');

    Regex::new(&regex).map_err(|e| FilesystemError::InvalidPattern {
        pattern: pattern.to_string(),
        error: e.to_string(),
    })
}

/// Copy files under `source` matching any of `patterns` into `destination`
///
/// The path relative to `source` is preserved. Returns the destination
/// paths in walk order.
pub fn install_files(
    source: &Path,
    patterns: &[String],
    destination: &Path,
) -> Result<Vec<PathBuf>, FilesystemError> {
    let matchers = patterns
        .iter()
        .map(|p| glob_to_regex(p))
        .collect::<Result<Vec<_>, _>>()?;

    let mut installed = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| FilesystemError::ReadFile {
            path: source.to_path_buf(),
            error: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !matchers.iter().any(|m| m.is_match(&key)) {
            continue;
        }

        let target = destination.join(relative);
        tracing::info!(
            "Installing {} -> {}",
            entry.path().display(),
            target.display()
        );
        copy_file(entry.path(), &target)?;
        installed.push(target);
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, relative).unwrap();
    }

    #[test]
    fn test_glob_single_star_stays_in_component() {
        let re = glob_to_regex("*.h").unwrap();
        assert!(re.is_match("zlib.h"));
        assert!(!re.is_match("sub/zlib.h"));
        assert!(!re.is_match("zlib.hpp"));
    }

    #[test]
    fn test_glob_double_star_spans_components() {
        let re = glob_to_regex("**/*.hpp").unwrap();
        assert!(re.is_match("boost.hpp"));
        assert!(re.is_match("boost/asio/io.hpp"));
        assert!(!re.is_match("boost/asio/io.h"));
    }

    #[test]
    fn test_glob_escapes_regex_characters() {
        let re = glob_to_regex("lib+z?.a").unwrap();
        assert!(re.is_match("lib+z1.a"));
        assert!(!re.is_match("libbz1.a"));
    }

    #[test]
    fn test_install_files_preserves_relative_paths() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        let prefix = temp.path().join("prefix");
        touch(&source, "include/a.h");
        touch(&source, "include/sub/b.h");
        touch(&source, "include/c.c");

        let installed = install_files(
            &source.join("include"),
            &["**/*.h".to_string()],
            &prefix.join("include"),
        )
        .unwrap();

        assert_eq!(installed.len(), 2);
        assert!(prefix.join("include/a.h").is_file());
        assert!(prefix.join("include/sub/b.h").is_file());
        assert!(!prefix.join("include/c.c").exists());
    }

    #[test]
    fn test_install_files_no_match_is_empty() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "readme.txt");
        let installed =
            install_files(temp.path(), &["*.lib".to_string()], &temp.path().join("out")).unwrap();
        assert!(installed.is_empty());
    }

    #[test]
    fn test_remove_missing_dir_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(remove_dir_all(&temp.path().join("missing")).is_ok());
    }

    #[test]
    fn test_remove_dir_all_removes_tree() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "tree/a/b.txt");
        remove_dir_all(&temp.path().join("tree")).unwrap();
        assert!(!temp.path().join("tree").exists());
    }

    #[test]
    fn test_copy_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.txt");
        copy_file(&temp.path().join("a.txt"), &temp.path().join("x/y/a.txt")).unwrap();
        assert_eq!(
            read_file(&temp.path().join("x/y/a.txt")).unwrap(),
            "a.txt"
        );
    }
}

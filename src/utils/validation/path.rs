//! Path validation utilities
//!
//! Traversal detection, canonicalization and allow-list containment for model artifact paths.

use crate::error::{FilterError, Result};
use std::path::{Component, Path, PathBuf};

/// Validator for file system paths and extensions
pub struct PathValidator;

impl PathValidator {
    /// Whether a path contains a parent-directory (`..`) component
    pub fn has_traversal<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    }

    /// Reject paths with a traversal component
    pub fn reject_traversal<P: AsRef<Path>>(path: P) -> Result<()> {
        let path_ref = path.as_ref();
        if Self::has_traversal(path_ref) {
            return Err(FilterError::path_security(format!(
                "Path traversal detected in model path: {}",
                path_ref.display()
            )));
        }
        Ok(())
    }

    /// Resolve to an absolute, symlink-free path
    pub fn canonicalize<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        let path_ref = path.as_ref();
        std::fs::canonicalize(path_ref).map_err(|e| {
            FilterError::path_security(format!(
                "Failed to canonicalize path {}: {}",
                path_ref.display(),
                e
            ))
        })
    }

    /// Whether `path` lies inside `directory`
    ///
    /// Both sides are canonicalized and compared component-wise, so `/data/models-evil` is not
    /// inside `/data/models` and symlinks are resolved before the comparison. Returns `false`
    /// when either side cannot be resolved.
    pub fn is_path_in_directory<P: AsRef<Path>, D: AsRef<Path>>(path: P, directory: D) -> bool {
        let (Ok(path), Ok(directory)) = (
            std::fs::canonicalize(path.as_ref()),
            std::fs::canonicalize(directory.as_ref()),
        ) else {
            return false;
        };
        Self::is_canonical_path_in_directory(&path, &directory)
    }

    /// Containment check for paths that are already canonical
    pub fn is_canonical_path_in_directory(path: &Path, directory: &Path) -> bool {
        path.strip_prefix(directory).is_ok_and(|relative| {
            !relative
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        })
    }

    /// Lexically clean a user-supplied path string
    ///
    /// Backslashes become `/`, `..` and `.` segments are dropped and repeated separators collapse.
    /// The result never escapes its starting point, but it is not a substitute for
    /// canonicalization plus an allow-list check.
    pub fn sanitize(path: &str) -> String {
        let unified = path.replace('\\', "/");
        let absolute = unified.starts_with('/');
        let segments: Vec<&str> = unified
            .split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .collect();

        let joined = segments.join("/");
        if absolute {
            format!("/{}", joined)
        } else {
            joined
        }
    }

    /// Validate that a path has a specific extension (case-insensitive)
    pub fn validate_extension<P: AsRef<Path>>(path: P, expected_ext: &str) -> Result<()> {
        let path_ref = path.as_ref();
        let actual_ext = path_ref.extension().and_then(|s| s.to_str()).unwrap_or("");

        if !actual_ext.eq_ignore_ascii_case(expected_ext) {
            return Err(FilterError::integrity(format!(
                "Expected {} file, but got: {}",
                expected_ext,
                path_ref.display()
            )));
        }
        Ok(())
    }

    /// Validate that a path names an existing regular file, returning its size in bytes
    ///
    /// Uses `symlink_metadata`, so a symlink is reported as non-regular rather than followed.
    pub fn validate_regular_file<P: AsRef<Path>>(path: P) -> Result<u64> {
        let path_ref = path.as_ref();
        let metadata = std::fs::symlink_metadata(path_ref).map_err(|_| {
            FilterError::integrity(format!("Model file does not exist: {}", path_ref.display()))
        })?;

        if !metadata.file_type().is_file() {
            return Err(FilterError::integrity(format!(
                "Model path is not a regular file: {}",
                path_ref.display()
            )));
        }

        Ok(metadata.len())
    }
}

//! Confinement of file-tool paths to a root directory.

use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::core::tools::ToolError;

/// Resolves model-supplied paths and refuses anything outside `root`.
///
/// Symlinks are resolved before the containment check, so a link inside the
/// root that points elsewhere is refused too.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Guard `root`, which must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be canonicalized.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an existing path for reading.
    pub fn resolve_read(&self, raw: &str) -> Result<PathBuf, ToolError> {
        let joined = self.root.join(check_raw(raw)?);
        let canonical = joined
            .canonicalize()
            .map_err(|e| ToolError::ExecutionFailed(format!("Cannot access {raw}: {e}")))?;
        self.ensure_inside(&canonical, raw)?;
        Ok(canonical)
    }

    /// Resolve a path for writing. Missing parent directories are allowed;
    /// the nearest existing ancestor must be inside the root.
    ///
    /// Symlinks are not followed for the target itself, and a dangling link
    /// anywhere on the way is refused.
    pub fn resolve_write(&self, raw: &str) -> Result<PathBuf, ToolError> {
        let joined = self.root.join(check_raw(raw)?);

        let mut missing = Vec::new();
        let mut existing = joined.as_path();
        let metadata = loop {
            if let Some(metadata) = lstat(existing, raw)? {
                break metadata;
            }
            let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
                return Err(ToolError::Rejected(format!("Invalid path: {raw}")));
            };
            missing.push(name.to_os_string());
            existing = parent;
        };

        if metadata.file_type().is_symlink() && missing.is_empty() {
            return Err(ToolError::Rejected(format!(
                "Refusing to write through a symlink: {raw}"
            )));
        }
        let mut resolved = existing.canonicalize().map_err(|e| {
            if metadata.file_type().is_symlink() {
                ToolError::Rejected(format!("Path goes through a dangling symlink: {raw}"))
            } else {
                ToolError::ExecutionFailed(format!("Cannot access {raw}: {e}"))
            }
        })?;
        self.ensure_inside(&resolved, raw)?;
        for name in missing.iter().rev() {
            resolved.push(name);
        }
        if resolved.is_dir() {
            return Err(ToolError::Rejected(format!("Path is a directory: {raw}")));
        }
        Ok(resolved)
    }

    fn ensure_inside(&self, path: &Path, raw: &str) -> Result<(), ToolError> {
        if path.starts_with(&self.root) {
            Ok(())
        } else {
            tracing::warn!(path = %raw, root = %self.root.display(), "path escapes root");
            Err(ToolError::Rejected(format!(
                "Path is outside the working directory: {raw}"
            )))
        }
    }
}

/// `symlink_metadata`, with a missing path as `None`.
pub(crate) fn lstat(path: &Path, raw: &str) -> Result<Option<Metadata>, ToolError> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ToolError::ExecutionFailed(format!("Cannot access {raw}: {e}"))),
    }
}

fn check_raw(raw: &str) -> Result<&Path, ToolError> {
    if raw.trim().is_empty() {
        return Err(ToolError::Rejected("Path must not be empty".to_string()));
    }
    if raw.contains('\0') {
        return Err(ToolError::Rejected("Path must not contain NUL bytes".to_string()));
    }
    let path = Path::new(raw);
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(ToolError::Rejected(format!(
            "Path traversal ('..') is not allowed: {raw}"
        )));
    }
    Ok(path)
}

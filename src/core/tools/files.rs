//! `read_file` and `write_file`, confined by a [`PathGuard`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use super::{Parameter, Tool, ToolError, ToolResult, ToolSpec, parse_args};
use crate::core::sandbox::{ExecutionLimits, PathGuard, format_output, lstat};

/// Returned for files with no content.
pub const EMPTY_FILE: &str = "(empty file)";

#[derive(Debug, Deserialize)]
struct ReadArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

pub struct ReadFileTool {
    spec: ToolSpec,
    guard: Arc<PathGuard>,
    limits: ExecutionLimits,
}

impl ReadFileTool {
    pub fn new(guard: Arc<PathGuard>, limits: ExecutionLimits) -> Self {
        Self {
            spec: ToolSpec::new(
                "read_file",
                "Read a text file inside the working directory.",
                vec![Parameter::required(
                    "path",
                    "Path relative to the working directory",
                )],
            ),
            guard,
            limits,
        }
    }

    async fn read(&self, raw: &str) -> Result<String, ToolError> {
        let path = self.guard.resolve_read(raw)?;
        let failed = |e: std::io::Error| ToolError::ExecutionFailed(format!("Failed to read {raw}: {e}"));
        if path.is_dir() {
            return Err(ToolError::ExecutionFailed(format!("{raw} is a directory")));
        }
        let file = tokio::fs::File::open(&path).await.map_err(failed)?;
        let cap = self.limits.max_output_bytes;
        let mut bytes = Vec::new();
        file.take(u64::try_from(cap).unwrap_or(u64::MAX).saturating_add(1))
            .read_to_end(&mut bytes)
            .await
            .map_err(failed)?;
        let capped = bytes.len() > cap;
        bytes.truncate(cap);
        if bytes.is_empty() {
            return Ok(EMPTY_FILE.to_string());
        }
        tracing::debug!(path = %path.display(), bytes = bytes.len(), capped, "read file");
        Ok(format_output(&String::from_utf8_lossy(&bytes), &self.limits, capped))
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, args: serde_json::Value) -> ToolResult {
        match parse_args::<ReadArgs>(&self.spec, args) {
            Ok(args) => self.read(&args.path).await.into(),
            Err(e) => e.into(),
        }
    }
}

pub struct WriteFileTool {
    spec: ToolSpec,
    guard: Arc<PathGuard>,
}

impl WriteFileTool {
    pub fn new(guard: Arc<PathGuard>) -> Self {
        Self {
            spec: ToolSpec::new(
                "write_file",
                "Write text to a file inside the working directory, replacing any existing \
                 content. Parent directories are created as needed.",
                vec![
                    Parameter::required(
                        "path",
                        "Path relative to the working directory",
                    ),
                    Parameter::required("content", "Full file content"),
                ],
            ),
            guard,
        }
    }

    async fn write(&self, raw: &str, content: &str) -> Result<String, ToolError> {
        let path = self.guard.resolve_write(raw)?;
        let failed = |e: std::io::Error| ToolError::ExecutionFailed(format!("Failed to write {raw}: {e}"));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }
        // A link may have appeared since the path was resolved.
        if lstat(&path, raw)?.is_some_and(|m| m.file_type().is_symlink()) {
            return Err(ToolError::Rejected(format!(
                "Refusing to write through a symlink: {raw}"
            )));
        }
        tokio::fs::write(&path, content).await.map_err(failed)?;
        tracing::info!(path = %path.display(), bytes = content.len(), "wrote file");
        Ok(format!("Wrote {} bytes to {raw}", content.len()))
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, args: serde_json::Value) -> ToolResult {
        match parse_args::<WriteArgs>(&self.spec, args) {
            Ok(args) => self.write(&args.path, &args.content).await.into(),
            Err(e) => e.into(),
        }
    }
}

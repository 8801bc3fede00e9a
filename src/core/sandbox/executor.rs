//! Bounded execution of approved commands.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::validator::ApprovedCommand;
use crate::core::tools::{ToolError, ToolResult};

/// Wall-clock limit per command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bytes captured per stream before the process is stopped.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Characters returned to the model before truncation.
pub const DEFAULT_DISPLAY_CHARS: usize = 10_000;

/// Placeholder returned when a command succeeds silently.
pub const EMPTY_OUTPUT: &str = "(empty output)";

/// Resource bounds applied to every execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
    pub display_chars: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            display_chars: DEFAULT_DISPLAY_CHARS,
        }
    }
}

/// Runs [`ApprovedCommand`]s through `sh -c` with a timeout and output cap.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    limits: ExecutionLimits,
    working_dir: Option<PathBuf>,
    scrubbed_env: Vec<String>,
}

impl ExecutionEngine {
    #[must_use]
    pub fn new(limits: ExecutionLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Run commands from `dir` instead of the current directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Remove these variables from the child environment.
    #[must_use]
    pub fn with_scrubbed_env<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scrubbed_env.extend(keys.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Execute `command`. Every failure, timeouts included, comes back as a
    /// failed [`ToolResult`].
    pub async fn execute(&self, command: &ApprovedCommand) -> ToolResult {
        self.run(command).await.into()
    }

    async fn run(&self, command: &ApprovedCommand) -> Result<String, ToolError> {
        let started = Instant::now();
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command.invocation())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        for key in &self.scrubbed_env {
            cmd.env_remove(key);
        }

        let mut child = cmd.spawn().map_err(|e| {
            ToolError::ExecutionFailed(format!("failed to start command: {e}"))
        })?;
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ToolError::ExecutionFailed(
                "command output was not captured".to_string(),
            ));
        };

        let cap = self.limits.max_output_bytes;
        let collected = tokio::time::timeout(self.limits.timeout, async {
            let (stdout, stderr) =
                tokio::try_join!(read_capped(stdout, cap), read_capped(stderr, cap))?;
            if stdout.capped || stderr.capped {
                // Nobody reads the pipes any more; stop the writer.
                let _ = child.start_kill();
            }
            let status = child.wait().await?;
            Ok::<_, io::Error>((status, stdout, stderr))
        })
        .await;

        let (status, stdout, stderr) = match collected {
            Ok(Ok(parts)) => parts,
            Ok(Err(e)) => {
                return Err(ToolError::ExecutionFailed(format!(
                    "failed to read command output: {e}"
                )));
            }
            Err(_) => {
                let _ = child.kill().await;
                tracing::warn!(
                    command = %command.normalized(),
                    timeout_ms = self.limits.timeout.as_millis(),
                    "command timed out"
                );
                return Err(ToolError::ExecutionFailed(format!(
                    "Command timed out after {}: {}",
                    describe_duration(self.limits.timeout),
                    command.normalized()
                )));
            }
        };

        tracing::info!(
            command = %command.normalized(),
            exit_code = ?status.code(),
            stdout_bytes = stdout.bytes.len(),
            capped = stdout.capped,
            elapsed_ms = started.elapsed().as_millis(),
            "command finished"
        );

        if stdout.capped {
            return Ok(format_output(
                &String::from_utf8_lossy(&stdout.bytes),
                &self.limits,
                true,
            ));
        }
        if !status.success() {
            return Err(ToolError::ExecutionFailed(failure_message(
                command.normalized(),
                status,
                &stdout.bytes,
                &stderr.bytes,
            )));
        }
        Ok(format_output(
            &String::from_utf8_lossy(&stdout.bytes),
            &self.limits,
            false,
        ))
    }
}

struct Captured {
    bytes: Vec<u8>,
    capped: bool,
}

/// Read up to `cap` bytes, noting whether the stream had more.
async fn read_capped<R>(reader: R, cap: usize) -> io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let limit = u64::try_from(cap).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    reader.take(limit).read_to_end(&mut bytes).await?;
    let capped = bytes.len() > cap;
    bytes.truncate(cap);
    Ok(Captured { bytes, capped })
}

/// Shape captured text for the model.
///
/// Empty text becomes [`EMPTY_OUTPUT`]. Text longer than
/// `limits.display_chars` keeps its head and gains a marker with the full
/// captured length. `capped` adds a note that capture itself stopped early.
#[must_use]
pub fn format_output(text: &str, limits: &ExecutionLimits, capped: bool) -> String {
    if text.is_empty() {
        return EMPTY_OUTPUT.to_string();
    }
    let total = text.chars().count();
    let mut out = if total > limits.display_chars {
        let head: String = text.chars().take(limits.display_chars).collect();
        format!("{head}\n\n[Output truncated. Total length: {total} chars]")
    } else {
        text.to_string()
    };
    if capped {
        out.push_str(&format!(
            "\n[Capture stopped at {} bytes; the command produced more]",
            limits.max_output_bytes
        ));
    }
    out
}

fn failure_message(command: &str, status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> String {
    let code = status
        .code()
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    let mut message = format!("Command failed (exit code {code}): {command}");
    let stderr = String::from_utf8_lossy(stderr);
    let detail = if stderr.trim().is_empty() {
        String::from_utf8_lossy(stdout).into_owned()
    } else {
        stderr.into_owned()
    };
    let detail = detail.trim_end();
    if !detail.is_empty() {
        message.push('\n');
        message.push_str(detail);
    }
    message
}

fn describe_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

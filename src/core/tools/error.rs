//! Tool failures and the result value every tool returns.

use agent_core::ToolOutcome;

/// Why a tool call did not produce output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// A sandbox gate refused the request.
    #[error("{0}")]
    Rejected(String),

    /// The command or file operation ran and failed, or timed out.
    #[error("{0}")]
    ExecutionFailed(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    /// The run was stopped; no new tool calls are dispatched.
    #[error("tool calls are no longer accepted: run stopped")]
    Stopped,
}

/// Output of a tool call. Failures are values here, never panics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: Some(message.into()),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Text fed back to the model: the error message for failures.
    #[must_use]
    pub fn content(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.output)
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        Self::failure(err.to_string())
    }
}

impl From<Result<String, ToolError>> for ToolResult {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(output) => Self::success(output),
            Err(err) => err.into(),
        }
    }
}

impl From<ToolResult> for ToolOutcome {
    fn from(result: ToolResult) -> Self {
        match result.error {
            Some(message) => Self::error(message),
            None => Self::ok(result.output),
        }
    }
}

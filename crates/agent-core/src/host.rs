//! The seam between the agent loop and whatever executes tools.

use async_trait::async_trait;

use crate::types::Tool;

/// Outcome of a single tool call as seen by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Text returned to the model.
    pub content: String,
    /// Whether the call failed.
    pub is_error: bool,
}

impl ToolOutcome {
    /// Successful outcome.
    #[must_use]
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Failed outcome.
    #[must_use]
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Something that can advertise and run tools.
///
/// Implementations must not fail: every problem is reported through
/// [`ToolOutcome::is_error`] so the model can react to it.
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// Definitions advertised to the model.
    fn definitions(&self) -> Vec<Tool>;

    /// Run the named tool with model-supplied input.
    async fn call(&self, name: &str, input: serde_json::Value) -> ToolOutcome;
}

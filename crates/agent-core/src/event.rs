//! Events emitted by the agent loop.

/// Progress notifications from a run, in the order they happen.
///
/// Consumers should ignore variants they do not handle; new kinds are added
/// without breaking existing handlers.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AgentEvent {
    /// A new model step is starting (1-based).
    Step { index: usize },
    /// The model asked for a tool.
    ToolCall {
        name: String,
        args: serde_json::Value,
    },
    /// The tool finished.
    ToolResult {
        name: String,
        result: String,
        is_error: bool,
    },
    /// A chunk of streamed assistant text.
    Text { chunk: String },
    /// The assistant finished a text block; `text` is the whole block.
    TextDone { text: String },
    /// The run failed.
    Error { message: String },
}

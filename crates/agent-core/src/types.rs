//! Provider-neutral conversation types.
//!
//! Providers translate these into their wire formats; nothing here is
//! serialized directly.

/// One turn in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
}

impl Message {
    #[must_use]
    pub const fn new(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self { role, blocks }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A piece of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
    },

    /// The assistant asked for a tool.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// A tool's output, sent back on the user side.
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

/// Tool definition advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub input_schema: serde_json::Value,
}

/// Why a completion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

//! Conversation state for a single run.

use crate::types::{ContentBlock, Message, Role};

/// In-memory message buffer for one agent run.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    system: Option<String>,
}

impl Conversation {
    /// Create a conversation with a system prompt.
    #[must_use]
    pub fn with_system(system: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            system: Some(system.into()),
        }
    }

    /// Get the system prompt.
    #[must_use]
    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    /// Get all messages.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Add a user message.
    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.messages.push(Message::new(
            Role::User,
            vec![ContentBlock::Text { text: text.into() }],
        ));
    }

    /// Add an assistant turn. Empty text blocks are dropped.
    pub fn add_assistant_blocks(&mut self, blocks: Vec<ContentBlock>) {
        let blocks: Vec<ContentBlock> = blocks
            .into_iter()
            .filter(|b| !matches!(b, ContentBlock::Text { text } if text.is_empty()))
            .collect();

        if blocks.is_empty() {
            return;
        }

        self.messages.push(Message::new(Role::Assistant, blocks));
    }

    /// Add a tool result.
    pub fn add_tool_result(&mut self, tool_use_id: String, content: String, is_error: bool) {
        let block = ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        };
        self.messages.push(Message::new(Role::User, vec![block]));
    }

    /// Check if the conversation has any messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

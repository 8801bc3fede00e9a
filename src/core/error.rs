//! Error types for the core module.

/// Core error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required setting, such as the API key, is absent.
    #[error("{name} is not set. Export it before running the agent.")]
    ConfigurationMissing { name: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The agent run ended without a final answer.
    #[error(transparent)]
    AgentFailure(#[from] agent_core::AgentError),

    /// A built-in command rule failed to compile.
    #[error("invalid command rule: {0}")]
    Pattern(#[from] regex::Error),

    /// Tool registration failed.
    #[error("tool setup failed: {0}")]
    Tool(#[from] crate::core::tools::ToolError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

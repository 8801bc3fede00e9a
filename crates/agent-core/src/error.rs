//! Agent error types.

/// Agent-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// API key not configured.
    #[error("API key not configured")]
    ApiKeyMissing,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The run used up its step budget without finishing.
    #[error("step limit of {0} reached before the agent finished")]
    StepLimit(usize),

    /// The run was stopped by an external signal.
    #[error("run cancelled")]
    Cancelled,
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

//! Minimal tool-calling agent loop.
//!
//! The loop streams completions from an [`LlmProvider`], hands tool calls to a
//! [`ToolHost`], and reports progress as [`AgentEvent`]s on a channel so the
//! caller can render them without sharing state with the loop.

pub mod agent;
pub mod conversation;
pub mod error;
pub mod event;
pub mod host;
pub mod provider;
pub mod providers;
pub mod stop;
pub mod types;

pub use agent::{Agent, AgentOptions, DEFAULT_MAX_STEPS, DEFAULT_MAX_TOKENS};
pub use error::{AgentError, Result};
pub use event::AgentEvent;
pub use host::{ToolHost, ToolOutcome};
pub use stop::StopSignal;

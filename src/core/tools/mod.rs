//! Tools the review agent can call, and the registry that dispatches them.

mod command;
mod error;
mod files;
mod registry;
mod schema;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

pub use command::CommandTool;
pub use error::{ToolError, ToolResult};
pub use files::{EMPTY_FILE, ReadFileTool, WriteFileTool};
pub use registry::ToolRegistry;
pub use schema::{Parameter, ToolSpec};

/// A named capability the model can invoke.
///
/// `execute` is only called with arguments that passed
/// [`ToolSpec::check_args`], and must report failures through the returned
/// [`ToolResult`].
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    async fn execute(&self, args: serde_json::Value) -> ToolResult;
}

/// Deserialize checked arguments into a typed struct.
pub(crate) fn parse_args<T: DeserializeOwned>(
    spec: &ToolSpec,
    args: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: spec.name.clone(),
        reason: e.to_string(),
    })
}

//! Name-indexed tool dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use agent_core::types::Tool as ToolDefinition;
use agent_core::{StopSignal, ToolHost, ToolOutcome};
use async_trait::async_trait;

use super::{Tool, ToolError, ToolResult};

/// Registered tools in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    stop: StopSignal,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Share the run's stop flag; once raised, no new calls are dispatched.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Register `tool` under its spec name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is taken.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), ToolError> {
        let name = tool.spec().name.clone();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    /// Tool names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.spec().name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate `args` and run the named tool.
    pub async fn dispatch(&self, name: &str, args: serde_json::Value) -> ToolResult {
        if self.stop.is_stopped() {
            tracing::debug!(tool = %name, "dispatch refused after stop");
            return ToolError::Stopped.into();
        }
        let Some(tool) = self.index.get(name).map(|&i| Arc::clone(&self.tools[i])) else {
            tracing::warn!(tool = %name, "unknown tool requested");
            return ToolError::UnknownTool(name.to_string()).into();
        };
        if let Err(e) = tool.spec().check_args(&args) {
            return e.into();
        }
        tracing::info!(tool = %name, "dispatching tool");
        let result = tool.execute(args).await;
        if let Some(error) = &result.error {
            tracing::debug!(tool = %name, error = %error, "tool reported failure");
        }
        result
    }
}

#[async_trait]
impl ToolHost for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.spec().definition()).collect()
    }

    async fn call(&self, name: &str, input: serde_json::Value) -> ToolOutcome {
        self.dispatch(name, input).await.into()
    }
}

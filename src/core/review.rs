//! Wiring of tools, provider and renderer into one review run.

use std::path::Path;
use std::sync::Arc;

use agent_core::provider::LlmProvider;
use agent_core::providers::OpenAiProvider;
use agent_core::{Agent, AgentOptions, StopSignal};
use tokio::sync::mpsc;

use super::sandbox::{CommandPolicy, ExecutionEngine, PathGuard};
use super::tools::{CommandTool, ReadFileTool, ToolRegistry, WriteFileTool};
use super::Result;
use crate::config::{Config, SandboxConfig};
use crate::render::Renderer;

/// Instructions given to the model for every run.
pub const SYSTEM_PROMPT: &str = include_str!("../../prompts/system.md");

/// Build the registry with `bash`, `read_file`, `write_file`, `git` and `gh`,
/// all confined to `root`.
///
/// `scrubbed_env` names variables hidden from commands, such as the API key.
///
/// # Errors
///
/// Returns an error if `root` does not exist or a built-in rule is invalid.
pub fn build_registry(
    root: &Path,
    sandbox: &SandboxConfig,
    scrubbed_env: &[String],
    stop: StopSignal,
) -> Result<ToolRegistry> {
    let limits = sandbox.limits();
    let engine = Arc::new(
        ExecutionEngine::new(limits)
            .with_working_dir(root)
            .with_scrubbed_env(scrubbed_env.iter().cloned()),
    );
    let guard = Arc::new(PathGuard::new(root)?);

    let mut registry = ToolRegistry::new().with_stop_signal(stop);
    registry.register(CommandTool::bash(
        Arc::new(CommandPolicy::bash()?),
        Arc::clone(&engine),
    ))?;
    registry.register(ReadFileTool::new(Arc::clone(&guard), limits))?;
    registry.register(WriteFileTool::new(guard))?;
    registry.register(CommandTool::git(
        Arc::new(CommandPolicy::git()?),
        Arc::clone(&engine),
    ))?;
    registry.register(CommandTool::gh(Arc::new(CommandPolicy::gh()?), engine))?;

    tracing::debug!(tools = ?registry.names().collect::<Vec<_>>(), root = %root.display(), "tool registry ready");
    Ok(registry)
}

/// Agent options from configuration.
#[must_use]
pub fn agent_options(config: &Config) -> AgentOptions {
    AgentOptions {
        max_steps: config.agent.max_steps,
        max_tokens: config.agent.max_tokens,
        ..AgentOptions::new(config.agent.model.clone(), SYSTEM_PROMPT)
    }
}

/// Assemble an agent from any provider and a ready registry.
#[must_use]
pub fn create_agent(
    provider: Box<dyn LlmProvider>,
    registry: ToolRegistry,
    options: AgentOptions,
    stop: StopSignal,
) -> Agent {
    Agent::new(provider, Arc::new(registry), options).with_stop_signal(stop)
}

/// Build the review agent against the configured OpenAI-compatible endpoint.
///
/// # Errors
///
/// Returns an error if the provider or the tool registry cannot be built.
pub fn create_code_review_agent(
    config: &Config,
    api_key: String,
    root: &Path,
    stop: StopSignal,
) -> Result<Agent> {
    let provider = OpenAiProvider::with_base_url(api_key, config.agent.base_url.clone())?;
    let registry = build_registry(
        root,
        &config.sandbox,
        std::slice::from_ref(&config.agent.api_key_env),
        stop.clone(),
    )?;
    Ok(create_agent(
        Box::new(provider),
        registry,
        agent_options(config),
        stop,
    ))
}

/// Run `request` to completion, streaming events into `renderer`.
///
/// The renderer has drained every event and stopped its spinner by the time
/// this returns.
///
/// # Errors
///
/// Returns the agent's error if the run fails.
pub async fn run_review(agent: &Agent, request: &str, renderer: &mut Renderer) -> Result<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let run = async move {
        let result = agent.run(request, &tx).await;
        drop(tx);
        result
    };
    let (result, ()) = tokio::join!(run, renderer.run(rx));
    Ok(result?)
}

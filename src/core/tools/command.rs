//! Command-style tools: `bash`, `git` and `gh`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Parameter, Tool, ToolError, ToolResult, ToolSpec, parse_args};
use crate::core::sandbox::{CommandPolicy, CommandValidator, ExecutionEngine, ValidationOutcome};

#[derive(Debug, Deserialize)]
struct CommandArgs {
    command: String,
}

/// Validates a `command` argument against a policy and runs it.
pub struct CommandTool {
    spec: ToolSpec,
    validator: CommandValidator,
    engine: Arc<ExecutionEngine>,
}

impl CommandTool {
    pub fn new(
        spec: ToolSpec,
        policy: Arc<CommandPolicy>,
        engine: Arc<ExecutionEngine>,
    ) -> Self {
        Self {
            spec,
            validator: CommandValidator::new(policy),
            engine,
        }
    }

    /// General read-only system commands.
    pub fn bash(policy: Arc<CommandPolicy>, engine: Arc<ExecutionEngine>) -> Self {
        let description = format!(
            "Execute a read-only system command. Allowed commands: {}. \
             Shell operators, substitution, redirection and '..' are rejected.",
            policy.allow_list().describe()
        );
        Self::new(
            ToolSpec::new(
                "bash",
                description,
                vec![Parameter::required(
                    "command",
                    "The command to execute, e.g. 'ls -la src'",
                )],
            ),
            policy,
            engine,
        )
    }

    /// Read-only git inspection.
    pub fn git(policy: Arc<CommandPolicy>, engine: Arc<ExecutionEngine>) -> Self {
        let description = format!(
            "Run a read-only git command in the repository. Allowed subcommands: {}. \
             The leading 'git' is optional.",
            policy.allow_list().describe()
        );
        Self::new(
            ToolSpec::new(
                "git",
                description,
                vec![Parameter::required(
                    "command",
                    "git arguments, e.g. 'diff --staged' or 'log --oneline -10'",
                )],
            ),
            policy,
            engine,
        )
    }

    /// Read-only GitHub queries through the `gh` CLI.
    pub fn gh(policy: Arc<CommandPolicy>, engine: Arc<ExecutionEngine>) -> Self {
        let description = format!(
            "Query GitHub with the gh CLI. Allowed command groups: {}. \
             Only read actions such as view, list, diff and status are permitted.",
            policy.allow_list().describe()
        );
        Self::new(
            ToolSpec::new(
                "gh",
                description,
                vec![Parameter::required(
                    "command",
                    "gh arguments, e.g. 'pr view 42' or 'pr diff 42'",
                )],
            ),
            policy,
            engine,
        )
    }
}

#[async_trait]
impl Tool for CommandTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, args: serde_json::Value) -> ToolResult {
        let args: CommandArgs = match parse_args(&self.spec, args) {
            Ok(args) => args,
            Err(e) => return e.into(),
        };
        match self.validator.validate(&args.command) {
            ValidationOutcome::Approved(command) => {
                tracing::info!(tool = %self.spec.name, command = %command.normalized(), "executing command");
                self.engine.execute(&command).await
            }
            ValidationOutcome::Rejected { reason } => ToolError::Rejected(reason).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bash_tool(dir: &std::path::Path) -> CommandTool {
        CommandTool::bash(
            Arc::new(CommandPolicy::bash().unwrap()),
            Arc::new(ExecutionEngine::default().with_working_dir(dir)),
        )
    }

    #[test]
    fn descriptions_list_allowed_commands() {
        let dir = tempfile::tempdir().unwrap();
        let tool = bash_tool(dir.path());
        assert!(tool.spec().description.contains("pwd, whoami"));
        assert_eq!(tool.spec().name, "bash");
    }

    #[tokio::test]
    async fn runs_approved_command() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "line one\n").unwrap();
        let result = bash_tool(dir.path())
            .execute(json!({"command": "cat notes.txt"}))
            .await;
        assert_eq!(result, ToolResult::success("line one\n"));
    }

    #[tokio::test]
    async fn rejection_carries_reason_and_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let result = bash_tool(dir.path())
            .execute(json!({"command": "ls > listing.txt"}))
            .await;
        assert_eq!(
            result.error.as_deref(),
            Some("Command contains forbidden pattern for security reasons (redirection)")
        );
        assert!(!dir.path().join("listing.txt").exists());
    }

    #[tokio::test]
    async fn git_tool_prefixes_program() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CommandTool::git(
            Arc::new(CommandPolicy::git().unwrap()),
            Arc::new(ExecutionEngine::default().with_working_dir(dir.path())),
        );
        let result = tool.execute(json!({"command": "push origin main"})).await;
        assert!(
            result
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with("git subcommand 'push' is not allowed"))
        );
    }
}

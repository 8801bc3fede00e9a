//! Sandbox guarantees exercised through the assembled tool registry.

use std::path::Path;

use agent_core::StopSignal;
use serde_json::json;
use tokio_test::assert_ok;

use codereview_agent::config::SandboxConfig;
use codereview_agent::core::review::build_registry;
use codereview_agent::core::sandbox::EMPTY_OUTPUT;
use codereview_agent::core::tools::ToolRegistry;

fn registry(root: &Path, sandbox: &SandboxConfig) -> ToolRegistry {
    assert_ok!(build_registry(root, sandbox, &[], StopSignal::new()))
}

async fn bash(registry: &ToolRegistry, command: &str) -> codereview_agent::core::tools::ToolResult {
    registry.dispatch("bash", json!({ "command": command })).await
}

#[tokio::test]
async fn disallowed_command_never_runs() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path(), &SandboxConfig::default());

    let result = bash(&registry, "touch marker").await;

    let error = result.error.expect("touch must be rejected");
    assert!(error.starts_with("Command 'touch' is not allowed. Allowed commands:"));
    assert!(!dir.path().join("marker").exists());
}

#[tokio::test]
async fn forbidden_pattern_overrides_allow_list() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("secret"), "s3cr3t").unwrap();
    let registry = registry(dir.path(), &SandboxConfig::default());

    for command in [
        "echo a; touch marker",
        "cat secret; whoami",
        "cat ../../etc/passwd",
        "echo x > marker",
        "ls && touch marker",
    ] {
        let result = bash(&registry, command).await;
        let error = result.error.unwrap_or_default();
        assert!(
            error.starts_with("Command contains forbidden pattern for security reasons"),
            "{command:?} -> {error:?}"
        );
        assert!(!result.output.contains("s3cr3t"));
    }
    assert!(!dir.path().join("marker").exists());
}

#[tokio::test]
async fn ls_lists_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.md"), "hello").unwrap();
    let registry = registry(dir.path(), &SandboxConfig::default());

    let result = bash(&registry, "ls -la").await;

    assert!(!result.is_error(), "{result:?}");
    assert!(result.output.contains("notes.md"));
}

#[tokio::test]
async fn silent_command_reports_empty_output() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path(), &SandboxConfig::default());

    let result = bash(&registry, "find . -name does-not-exist").await;

    assert_eq!(result.output, EMPTY_OUTPUT);
    assert!(!result.is_error());
}

#[tokio::test]
async fn long_output_is_truncated_with_total_length() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("big.txt"), "x".repeat(12_000)).unwrap();
    let registry = registry(dir.path(), &SandboxConfig::default());

    let result = bash(&registry, "cat big.txt").await;

    assert!(result.output.starts_with(&"x".repeat(10_000)));
    assert!(
        result
            .output
            .ends_with("\n\n[Output truncated. Total length: 12000 chars]")
    );
}

#[tokio::test]
async fn output_is_capped_at_byte_limit() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("big.txt"), "x".repeat(12_000)).unwrap();
    let sandbox = SandboxConfig {
        max_output_bytes: 4096,
        display_chars: 100_000,
        ..SandboxConfig::default()
    };
    let registry = registry(dir.path(), &sandbox);

    let result = bash(&registry, "cat big.txt").await;

    assert!(result.output.starts_with(&"x".repeat(4096)));
    assert!(!result.output.starts_with(&"x".repeat(4097)));
    assert!(result.output.contains("Capture stopped at 4096 bytes"));
}

#[tokio::test]
async fn timeout_reports_error_without_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("log.txt"), "early line\n").unwrap();
    let sandbox = SandboxConfig {
        timeout_secs: 1,
        ..SandboxConfig::default()
    };
    let registry = registry(dir.path(), &sandbox);

    let result = bash(&registry, "tail -f log.txt").await;

    let error = result.error.expect("tail -f must time out");
    assert!(error.contains("timed out"), "{error}");
    assert!(!error.contains("early line"));
    assert!(result.output.is_empty());
}

#[tokio::test]
async fn file_tools_share_the_root() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path(), &SandboxConfig::default());

    let written = registry
        .dispatch(
            "write_file",
            json!({ "path": "review/REVIEW.md", "content": "# Review\n" }),
        )
        .await;
    assert_eq!(written.output, "Wrote 9 bytes to review/REVIEW.md");

    let listed = bash(&registry, "cat review/REVIEW.md").await;
    assert_eq!(listed.output, "# Review\n");

    let read = registry
        .dispatch("read_file", json!({ "path": "review/REVIEW.md" }))
        .await;
    assert_eq!(read.output, "# Review\n");

    let escaped = registry
        .dispatch("read_file", json!({ "path": "/etc/hostname" }))
        .await;
    assert!(escaped.is_error());
}

#[tokio::test]
async fn git_and_gh_reject_mutations_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path(), &SandboxConfig::default());

    let push = registry
        .dispatch("git", json!({ "command": "git push --force" }))
        .await;
    assert!(
        push.error
            .as_deref()
            .is_some_and(|e| e.starts_with("git subcommand 'push' is not allowed"))
    );

    let merge = registry
        .dispatch("gh", json!({ "command": "pr merge 1" }))
        .await;
    assert!(
        merge
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Command contains forbidden pattern"))
    );
}

#[tokio::test]
async fn registry_guards_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let stop = StopSignal::new();
    let registry = assert_ok!(build_registry(
        dir.path(),
        &SandboxConfig::default(),
        &[],
        stop.clone()
    ));

    let missing = registry.dispatch("bash", json!({})).await;
    assert_eq!(
        missing.error.as_deref(),
        Some("invalid arguments for bash: missing required parameter 'command'")
    );

    let unknown = registry.dispatch("curl", json!({ "command": "x" })).await;
    assert_eq!(unknown.error.as_deref(), Some("unknown tool: curl"));

    stop.stop();
    let stopped = bash(&registry, "pwd").await;
    assert_eq!(
        stopped.error.as_deref(),
        Some("tool calls are no longer accepted: run stopped")
    );
}

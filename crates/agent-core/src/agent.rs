//! The step-limited agent loop.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::conversation::Conversation;
use crate::error::{AgentError, Result};
use crate::event::AgentEvent;
use crate::host::ToolHost;
use crate::provider::{CompletionEvent, CompletionRequest, LlmProvider};
use crate::stop::StopSignal;
use crate::types::{ContentBlock, StopReason};

/// Default step budget for a run.
pub const DEFAULT_MAX_STEPS: usize = 50;

/// Default completion token budget per step.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Model identifier passed to the provider.
    pub model: String,
    /// System prompt for the run.
    pub system_prompt: String,
    /// Maximum number of model steps before the run is abandoned.
    pub max_steps: usize,
    /// Completion token budget per step.
    pub max_tokens: u32,
}

impl AgentOptions {
    #[must_use]
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            max_steps: DEFAULT_MAX_STEPS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// A tool call requested during a step.
struct PendingToolCall {
    id: String,
    name: String,
    input: serde_json::Value,
}

/// What one model step produced.
struct StepOutput {
    text: String,
    tool_calls: Vec<PendingToolCall>,
    stop_reason: Option<StopReason>,
}

/// Drives a conversation with an LLM, executing tool calls until the model stops.
pub struct Agent {
    provider: Box<dyn LlmProvider>,
    tools: Arc<dyn ToolHost>,
    options: AgentOptions,
    stop: StopSignal,
}

impl Agent {
    /// Create an agent.
    pub fn new(
        provider: Box<dyn LlmProvider>,
        tools: Arc<dyn ToolHost>,
        options: AgentOptions,
    ) -> Self {
        Self {
            provider,
            tools,
            options,
            stop: StopSignal::new(),
        }
    }

    /// Share an externally owned stop signal.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// The signal that halts this agent.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Model used by this agent.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.options.model
    }

    /// Run a task to completion, returning the final assistant text.
    ///
    /// Progress is pushed onto `events`; a closed receiver does not stop the run.
    /// Failures are also reported as [`AgentEvent::Error`] before being returned.
    ///
    /// # Errors
    ///
    /// Returns error if the provider fails, the step budget runs out, or the
    /// stop signal is raised.
    pub async fn run(&self, prompt: &str, events: &UnboundedSender<AgentEvent>) -> Result<String> {
        let result = self.run_steps(prompt, events).await;

        if let Err(e) = &result {
            tracing::warn!(error = %e, "agent run failed");
            emit(
                events,
                AgentEvent::Error {
                    message: e.to_string(),
                },
            );
        }

        result
    }

    async fn run_steps(&self, prompt: &str, events: &UnboundedSender<AgentEvent>) -> Result<String> {
        let mut conversation = Conversation::with_system(self.options.system_prompt.clone());
        conversation.add_user_message(prompt);

        for index in 1..=self.options.max_steps {
            if self.stop.is_stopped() {
                return Err(AgentError::Cancelled);
            }

            tracing::debug!(step = index, "starting step");
            emit(events, AgentEvent::Step { index });

            let step = self.stream_step(&conversation, events).await?;

            if !step.text.is_empty() {
                emit(
                    events,
                    AgentEvent::TextDone {
                        text: step.text.clone(),
                    },
                );
            }

            let mut blocks = vec![ContentBlock::Text {
                text: step.text.clone(),
            }];
            blocks.extend(step.tool_calls.iter().map(|call| ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            }));
            conversation.add_assistant_blocks(blocks);

            // Providers disagree on the finish reason when tools are requested,
            // so the presence of tool calls is what keeps the loop going.
            if step.tool_calls.is_empty() {
                if step.stop_reason == Some(StopReason::MaxTokens) {
                    tracing::warn!(step = index, "response hit the token limit");
                }
                return Ok(step.text);
            }

            for call in step.tool_calls {
                if self.stop.is_stopped() {
                    return Err(AgentError::Cancelled);
                }

                emit(
                    events,
                    AgentEvent::ToolCall {
                        name: call.name.clone(),
                        args: call.input.clone(),
                    },
                );

                let outcome = self.tools.call(&call.name, call.input).await;

                emit(
                    events,
                    AgentEvent::ToolResult {
                        name: call.name,
                        result: outcome.content.clone(),
                        is_error: outcome.is_error,
                    },
                );

                conversation.add_tool_result(call.id, outcome.content, outcome.is_error);
            }
        }

        Err(AgentError::StepLimit(self.options.max_steps))
    }

    async fn stream_step(
        &self,
        conversation: &Conversation,
        events: &UnboundedSender<AgentEvent>,
    ) -> Result<StepOutput> {
        let request = CompletionRequest {
            model: self.options.model.clone(),
            max_tokens: self.options.max_tokens,
            messages: conversation.messages().to_vec(),
            system: conversation.system().map(String::from),
            tools: Some(self.tools.definitions()),
        };

        let stream = self.provider.stream(request).await?;
        futures::pin_mut!(stream);

        let mut output = StepOutput {
            text: String::new(),
            tool_calls: Vec::new(),
            stop_reason: None,
        };

        while let Some(event) = stream.next().await {
            match event? {
                CompletionEvent::TextDelta(chunk) => {
                    output.text.push_str(&chunk);
                    emit(events, AgentEvent::Text { chunk });
                }
                CompletionEvent::ToolCall { id, name, input } => {
                    output.tool_calls.push(PendingToolCall { id, name, input });
                }
                CompletionEvent::Done { stop_reason } => {
                    output.stop_reason = stop_reason;
                }
            }
        }

        Ok(output)
    }
}

fn emit(events: &UnboundedSender<AgentEvent>, event: AgentEvent) {
    if events.send(event).is_err() {
        tracing::trace!("event receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::host::ToolOutcome;
    use crate::provider::CompletionStream;
    use crate::types::Tool;

    /// Replays one scripted response per step.
    struct ScriptedProvider {
        steps: Mutex<VecDeque<Vec<CompletionEvent>>>,
    }

    impl ScriptedProvider {
        fn new(steps: Vec<Vec<CompletionEvent>>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn stream(&self, _request: CompletionRequest) -> Result<CompletionStream> {
            let events = self.steps.lock().unwrap().pop_front().unwrap_or_default();
            Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
        }
    }

    /// Echoes the input back and records the calls it saw.
    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolHost for RecordingHost {
        fn definitions(&self) -> Vec<Tool> {
            vec![Tool {
                name: "bash".to_string(),
                description: "run".to_string(),
                input_schema: serde_json::json!({ "type": "object" }),
            }]
        }

        async fn call(&self, name: &str, input: serde_json::Value) -> ToolOutcome {
            self.calls.lock().unwrap().push(name.to_string());
            if name == "bash" {
                ToolOutcome::ok(format!("ran {}", input["command"].as_str().unwrap_or("")))
            } else {
                ToolOutcome::error(format!("unknown tool: {name}"))
            }
        }
    }

    fn tool_call(id: &str, name: &str, command: &str) -> CompletionEvent {
        CompletionEvent::ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input: serde_json::json!({ "command": command }),
        }
    }

    fn done(reason: StopReason) -> CompletionEvent {
        CompletionEvent::Done {
            stop_reason: Some(reason),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn runs_tools_then_returns_final_text() {
        let provider = ScriptedProvider::new(vec![
            vec![tool_call("c1", "bash", "pwd"), done(StopReason::ToolUse)],
            vec![
                CompletionEvent::TextDelta("All ".to_string()),
                CompletionEvent::TextDelta("good".to_string()),
                done(StopReason::EndTurn),
            ],
        ]);
        let host = Arc::new(RecordingHost::default());
        let agent = Agent::new(
            Box::new(provider),
            host.clone(),
            AgentOptions::new("test-model", "system"),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let text = agent.run("review", &tx).await.unwrap();

        assert_eq!(text, "All good");
        assert_eq!(*host.calls.lock().unwrap(), vec!["bash".to_string()]);
        assert_eq!(
            drain(&mut rx),
            vec![
                AgentEvent::Step { index: 1 },
                AgentEvent::ToolCall {
                    name: "bash".to_string(),
                    args: serde_json::json!({ "command": "pwd" }),
                },
                AgentEvent::ToolResult {
                    name: "bash".to_string(),
                    result: "ran pwd".to_string(),
                    is_error: false,
                },
                AgentEvent::Step { index: 2 },
                AgentEvent::Text {
                    chunk: "All ".to_string()
                },
                AgentEvent::Text {
                    chunk: "good".to_string()
                },
                AgentEvent::TextDone {
                    text: "All good".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn tool_errors_are_fed_back_not_fatal() {
        let provider = ScriptedProvider::new(vec![
            vec![tool_call("c1", "nope", "x"), done(StopReason::ToolUse)],
            vec![
                CompletionEvent::TextDelta("done".to_string()),
                done(StopReason::EndTurn),
            ],
        ]);
        let agent = Agent::new(
            Box::new(provider),
            Arc::new(RecordingHost::default()),
            AgentOptions::new("m", "s"),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(agent.run("go", &tx).await.unwrap(), "done");

        assert!(drain(&mut rx).contains(&AgentEvent::ToolResult {
            name: "nope".to_string(),
            result: "unknown tool: nope".to_string(),
            is_error: true,
        }));
    }

    #[tokio::test]
    async fn step_limit_ends_run_with_error_event() {
        let provider = ScriptedProvider::new(vec![
            vec![tool_call("c1", "bash", "ls"), done(StopReason::ToolUse)],
            vec![tool_call("c2", "bash", "ls"), done(StopReason::ToolUse)],
        ]);
        let mut options = AgentOptions::new("m", "s");
        options.max_steps = 2;
        let agent = Agent::new(
            Box::new(provider),
            Arc::new(RecordingHost::default()),
            options,
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = agent.run("loop", &tx).await.unwrap_err();

        assert!(matches!(err, AgentError::StepLimit(2)));
        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(AgentEvent::Error { .. })));
    }

    #[tokio::test]
    async fn stop_signal_prevents_new_steps() {
        let provider = ScriptedProvider::new(vec![vec![
            CompletionEvent::TextDelta("never".to_string()),
            done(StopReason::EndTurn),
        ]]);
        let host = Arc::new(RecordingHost::default());
        let stop = StopSignal::new();
        let agent = Agent::new(Box::new(provider), host.clone(), AgentOptions::new("m", "s"))
            .with_stop_signal(stop.clone());

        stop.stop();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = agent.run("go", &tx).await.unwrap_err();

        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(
            drain(&mut rx),
            vec![AgentEvent::Error {
                message: "run cancelled".to_string()
            }]
        );
        assert!(host.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_receiver_does_not_abort_run() {
        let provider = ScriptedProvider::new(vec![vec![
            CompletionEvent::TextDelta("ok".to_string()),
            done(StopReason::EndTurn),
        ]]);
        let agent = Agent::new(
            Box::new(provider),
            Arc::new(RecordingHost::default()),
            AgentOptions::new("m", "s"),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        assert_eq!(agent.run("go", &tx).await.unwrap(), "ok");
    }
}

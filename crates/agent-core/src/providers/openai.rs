//! `OpenAI` provider implementation.
//!
//! Streams completions from the Chat Completions API or any compatible endpoint.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::provider::{CompletionEvent, CompletionRequest, CompletionStream, LlmProvider};
use crate::types::{ContentBlock, Message, Role, StopReason, Tool};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// LLM provider for the `OpenAI` API and compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a provider for the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, None)
    }

    /// Create a provider, optionally pointing at a compatible endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty.
    pub fn with_base_url(api_key: impl Into<String>, base_url: Option<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AgentError::ApiKeyMissing);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

// Request types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_completion_tokens: u32,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    const fn text(role: &'static str, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: &'static str,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// Response types for SSE parsing

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Tool call being assembled from deltas.
#[derive(Debug, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

impl PendingCall {
    fn finish(self) -> CompletionEvent {
        let input = if self.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&self.arguments).unwrap_or_else(|e| {
                tracing::warn!(tool = %self.name, error = %e, "tool arguments are not valid JSON");
                serde_json::Value::String(self.arguments.clone())
            })
        };

        CompletionEvent::ToolCall {
            id: self.id,
            name: self.name,
            input,
        }
    }
}

/// Convert our messages to the chat completions format.
fn convert_messages(messages: &[Message], system: Option<&str>) -> Vec<ChatMessage> {
    let mut result = Vec::new();

    if let Some(sys) = system {
        result.push(ChatMessage::text("system", sys.to_string()));
    }

    for msg in messages {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        let mut text_parts = Vec::new();
        let mut tool_calls = Vec::new();

        for block in &msg.blocks {
            match block {
                ContentBlock::Text { text } => text_parts.push(text.as_str()),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ChatToolCall {
                    id: id.clone(),
                    call_type: "function",
                    function: ChatFunctionCall {
                        name: name.clone(),
                        arguments: input.to_string(),
                    },
                }),
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => result.push(ChatMessage {
                    role: "tool",
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: Some(tool_use_id.clone()),
                }),
            }
        }

        let text = (!text_parts.is_empty()).then(|| text_parts.join(""));
        if !tool_calls.is_empty() {
            result.push(ChatMessage {
                role: "assistant",
                content: text,
                tool_calls: Some(tool_calls),
                tool_call_id: None,
            });
        } else if let Some(text) = text {
            result.push(ChatMessage::text(role, text));
        }
    }

    result
}

/// Convert our tools to the function calling format.
fn convert_tools(tools: &[Tool]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|t| ChatTool {
            tool_type: "function",
            function: ChatFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}

/// Raw bytes of the event stream, decoded one complete event at a time so a
/// character split across network chunks survives.
#[derive(Debug, Default)]
struct SseBuffer {
    bytes: Vec<u8>,
}

impl SseBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.bytes
            .extend(chunk.iter().copied().filter(|&b| b != b'\r'));
    }

    /// Take the next complete event. `Some(None)` is an event without a
    /// usable chunk, such as `[DONE]` or a comment.
    fn next_event(&mut self) -> Option<Option<ChatChunk>> {
        let end = self.bytes.windows(2).position(|w| w == b"\n\n")?;
        let event: Vec<u8> = self.bytes.drain(..end + 2).collect();
        Some(parse_sse_event(&String::from_utf8_lossy(&event[..end])))
    }
}

/// Parse the data lines of one SSE event.
fn parse_sse_event(event: &str) -> Option<ChatChunk> {
    let data = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n");

    if data.is_empty() || data.trim() == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<ChatChunk>(&data) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            tracing::debug!(data = %data, error = %e, "failed to parse chat completion event");
            None
        }
    }
}

/// Convert finish reason to our stop reason.
fn convert_stop_reason(reason: &str) -> Option<StopReason> {
    match reason {
        "stop" => Some(StopReason::EndTurn),
        "tool_calls" | "function_call" => Some(StopReason::ToolUse),
        "length" => Some(StopReason::MaxTokens),
        _ => None,
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| AgentError::ApiKeyMissing)?,
        );

        let body = ChatRequest {
            model: request.model,
            max_completion_tokens: request.max_tokens,
            messages: convert_messages(&request.messages, request.system.as_deref()),
            tools: request.tools.as_deref().map(convert_tools),
            stream: true,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(url = %url, model = %body.model, messages = body.messages.len(), "sending completion request");

        let response = self
            .http
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let byte_stream = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = SseBuffer::default();
            let mut pending: BTreeMap<usize, PendingCall> = BTreeMap::new();
            let mut finished = false;

            futures::pin_mut!(byte_stream);

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(AgentError::from(e));
                        return;
                    }
                };
                buffer.push(&chunk);

                while let Some(event) = buffer.next_event() {
                    let Some(chunk) = event else {
                        continue;
                    };

                    for choice in chunk.choices {
                        if let Some(text) = choice.delta.content {
                            if !text.is_empty() {
                                yield Ok(CompletionEvent::TextDelta(text));
                            }
                        }

                        for tc in choice.delta.tool_calls.unwrap_or_default() {
                            let entry = pending.entry(tc.index).or_default();
                            if let Some(id) = tc.id {
                                entry.id = id;
                            }
                            if let Some(func) = tc.function {
                                if let Some(name) = func.name {
                                    entry.name.push_str(&name);
                                }
                                if let Some(args) = func.arguments {
                                    entry.arguments.push_str(&args);
                                }
                            }
                        }

                        if let Some(reason) = choice.finish_reason {
                            for (_, call) in std::mem::take(&mut pending) {
                                yield Ok(call.finish());
                            }
                            finished = true;
                            yield Ok(CompletionEvent::Done {
                                stop_reason: convert_stop_reason(&reason),
                            });
                        }
                    }
                }
            }

            // Some compatible servers close the stream without a finish reason.
            if !finished {
                let had_calls = !pending.is_empty();
                for (_, call) in std::mem::take(&mut pending) {
                    yield Ok(call.finish());
                }
                yield Ok(CompletionEvent::Done {
                    stop_reason: Some(if had_calls { StopReason::ToolUse } else { StopReason::EndTurn }),
                });
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_requires_api_key() {
        assert!(matches!(
            OpenAiProvider::new(""),
            Err(AgentError::ApiKeyMissing)
        ));
        assert!(OpenAiProvider::new("   ").is_err());
    }

    #[test]
    fn provider_name_is_openai() {
        let provider = OpenAiProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn custom_base_url_drops_trailing_slash() {
        let provider =
            OpenAiProvider::with_base_url("key", Some("http://localhost:8080/v1/".to_string()))
                .unwrap();
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn convert_tools_produces_function_type() {
        let tools = vec![Tool {
            name: "bash".to_string(),
            description: "Run a command".to_string(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }];

        let converted = convert_tools(&tools);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].tool_type, "function");
        assert_eq!(converted[0].function.name, "bash");
    }

    #[test]
    fn convert_messages_splits_tool_turns() {
        let messages = vec![
            Message::new(
                Role::User,
                vec![ContentBlock::Text {
                    text: "review please".to_string(),
                }],
            ),
            Message::new(
                Role::Assistant,
                vec![ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "git".to_string(),
                    input: serde_json::json!({ "command": "status" }),
                }],
            ),
            Message::new(
                Role::User,
                vec![ContentBlock::ToolResult {
                    tool_use_id: "call_1".to_string(),
                    content: "clean".to_string(),
                    is_error: false,
                }],
            ),
        ];

        let converted = convert_messages(&messages, Some("system prompt"));
        let roles: Vec<&str> = converted.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);

        let assistant = &converted[2];
        assert!(assistant.content.is_none());
        let calls = assistant.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"command":"status"}"#);
        assert_eq!(converted[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn convert_stop_reason_maps_correctly() {
        assert_eq!(convert_stop_reason("stop"), Some(StopReason::EndTurn));
        assert_eq!(convert_stop_reason("tool_calls"), Some(StopReason::ToolUse));
        assert_eq!(convert_stop_reason("length"), Some(StopReason::MaxTokens));
        assert_eq!(convert_stop_reason("unknown"), None);
    }

    #[test]
    fn parse_sse_event_handles_done() {
        assert!(parse_sse_event("data: [DONE]").is_none());
    }

    #[test]
    fn sse_buffer_waits_for_complete_event() {
        let mut buffer = SseBuffer::default();
        buffer.push(b"data: {\"choices\":[]");
        assert!(buffer.next_event().is_none());
    }

    #[test]
    fn sse_buffer_reads_text_delta() {
        let mut buffer = SseBuffer::default();
        buffer.push(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"hi\"},\"finish_reason\":null}]}\r\n\r\nrest",
        );
        let chunk = buffer.next_event().unwrap().unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("hi"));
        assert_eq!(buffer.bytes, b"rest");
        assert!(buffer.next_event().is_none());
    }

    #[test]
    fn sse_buffer_keeps_character_split_across_chunks() {
        let event = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"},\"finish_reason\":null}]}\n\n";
        let bytes = event.as_bytes();
        // Cut inside the three-byte encoding of the first character.
        let cut = event.find('你').unwrap() + 2;

        let mut buffer = SseBuffer::default();
        buffer.push(&bytes[..cut]);
        assert!(buffer.next_event().is_none());
        buffer.push(&bytes[cut..]);
        let chunk = buffer.next_event().unwrap().unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("你好"));
    }

    #[test]
    fn pending_call_parses_arguments() {
        let call = PendingCall {
            id: "call_9".to_string(),
            name: "read_file".to_string(),
            arguments: r#"{"path":"src/lib.rs"}"#.to_string(),
        };

        assert_eq!(
            call.finish(),
            CompletionEvent::ToolCall {
                id: "call_9".to_string(),
                name: "read_file".to_string(),
                input: serde_json::json!({ "path": "src/lib.rs" }),
            }
        );
    }

    #[test]
    fn pending_call_without_arguments_is_empty_object() {
        let call = PendingCall {
            id: "call_1".to_string(),
            name: "bash".to_string(),
            arguments: String::new(),
        };

        match call.finish() {
            CompletionEvent::ToolCall { input, .. } => assert_eq!(input, serde_json::json!({})),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

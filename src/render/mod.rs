//! Terminal rendering of agent events.
//!
//! The [`Renderer`] owns a two-state machine, idle or spinning on a tool
//! call, and is fed [`AgentEvent`]s over a channel so the agent loop never
//! touches the terminal.

mod format;
mod spinner;

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use agent_core::AgentEvent;
use crossterm::style::Color;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

pub use format::{
    ERROR_PREVIEW_LINES, PREVIEW_LINE_CHARS, PREVIEW_LINES, Palette, format_result_preview,
    format_tool_call, rule,
};
pub use spinner::{FRAMES, SharedSink, Spinner, TICK};

/// Observable renderer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererState {
    Idle,
    Spinning { label: String },
}

/// How the renderer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Animate spinners. Off for pipes and tests.
    pub animate: bool,
    pub palette: Palette,
}

impl RenderOptions {
    /// Plain, static output.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            animate: false,
            palette: Palette::new(false),
        }
    }
}

struct ActiveCall {
    name: String,
    spinner: Spinner,
}

pub struct Renderer {
    sink: SharedSink,
    options: RenderOptions,
    active: Option<ActiveCall>,
}

impl Renderer {
    pub fn new(sink: impl Write + Send + 'static, options: RenderOptions) -> Self {
        let sink: Box<dyn Write + Send> = Box::new(sink);
        Self {
            sink: Arc::new(Mutex::new(sink)),
            options,
            active: None,
        }
    }

    /// Render to stdout, animating and colouring only on a terminal.
    #[must_use]
    pub fn stdout() -> Self {
        let is_terminal = std::io::stdout().is_terminal();
        Self::new(
            std::io::stdout(),
            RenderOptions {
                animate: is_terminal,
                palette: Palette::detect(is_terminal),
            },
        )
    }

    #[must_use]
    pub fn state(&self) -> RendererState {
        match &self.active {
            Some(call) => RendererState::Spinning {
                label: call.spinner.label().to_string(),
            },
            None => RendererState::Idle,
        }
    }

    /// Consume events until the channel closes.
    pub async fn run(&mut self, mut events: UnboundedReceiver<AgentEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        self.finish().await;
    }

    /// Apply one event.
    pub async fn handle(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::Step { index } => {
                tracing::debug!(step = index, "agent step");
            }
            AgentEvent::ToolCall { name, args } => {
                self.finish().await;
                let label = format_tool_call(&name, &args);
                let spinner = Spinner::start(
                    label,
                    Arc::clone(&self.sink),
                    self.options.animate,
                    self.options.palette,
                );
                self.active = Some(ActiveCall { name, spinner });
            }
            AgentEvent::ToolResult {
                name,
                result,
                is_error,
            } => {
                let Some(call) = self.active.take() else {
                    tracing::debug!(tool = %name, "tool result without an active call");
                    return;
                };
                if call.name != name {
                    tracing::warn!(expected = %call.name, got = %name, "tool result name mismatch");
                }
                let label = call.spinner.label().to_string();
                call.spinner.stop().await;
                let palette = self.options.palette;
                let (status, lines) = if is_error {
                    (
                        format!("{} {label}", palette.color("✖", Color::Red)),
                        ERROR_PREVIEW_LINES,
                    )
                } else {
                    (
                        format!("{} {}", palette.color("✔", Color::Green), palette.dim(&label)),
                        PREVIEW_LINES,
                    )
                };
                let preview = format_result_preview(&result, lines, palette);
                self.write(&format!("{status}\n{preview}"));
            }
            AgentEvent::Text { chunk } => {
                self.finish().await;
                self.write(&chunk);
            }
            AgentEvent::TextDone { text } => {
                if !text.ends_with('\n') {
                    self.write("\n");
                }
            }
            AgentEvent::Error { message } => {
                if let Some(call) = self.active.take() {
                    call.spinner.stop().await;
                    let failed = self.options.palette.color("✖ Error", Color::Red);
                    self.write(&format!("{failed}\n"));
                }
                let line = self.options.palette.color(&format!("Error: {message}"), Color::Red);
                self.write(&format!("\n{line}\n"));
            }
            other => {
                tracing::trace!(event = ?other, "ignoring event");
            }
        }
    }

    /// Stop any live spinner without printing an outcome.
    pub async fn finish(&mut self) {
        if let Some(call) = self.active.take() {
            call.spinner.stop().await;
        }
    }

    /// Session banner: title, rule and request.
    pub fn print_header(&self, model: &str, request: &str) {
        let palette = self.options.palette;
        let title = palette.bold(&palette.color("Code Review Agent", Color::Cyan));
        let model = palette.dim(&format!(" (model: {model})"));
        let rule = palette.dim(&rule());
        let label = palette.bold("Request:");
        self.write(&format!("\n{title}{model}\n{rule}\n\n{label} {request}\n\n"));
    }

    pub fn print_footer(&self) {
        let palette = self.options.palette;
        self.write(&format!(
            "\n{}\n{} {}\n\n",
            palette.dim(&rule()),
            palette.color("✓", Color::Green),
            palette.dim("Review completed")
        ));
    }

    pub fn print_failure(&self, message: &str) {
        let line = self
            .options
            .palette
            .color(&format!("✗ Failed to run agent: {message}"), Color::Red);
        self.write(&format!("\n{line}\n"));
    }

    fn write(&self, text: &str) {
        let mut out = self.sink.lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            tracing::debug!(error = %e, "failed to write to terminal");
        }
    }
}

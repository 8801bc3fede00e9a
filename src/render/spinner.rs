//! Animated progress line for a running tool call.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::style::Color;
use crossterm::terminal::{Clear, ClearType};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::format::Palette;

/// Output shared between the renderer and the spinner task.
pub type SharedSink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Braille "dots" frames.
pub const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Redraw interval.
pub const TICK: Duration = Duration::from_millis(80);

/// A spinner for one tool call. Dropping it without [`Spinner::stop`]
/// aborts the animation task.
pub struct Spinner {
    label: String,
    ticker: Option<Ticker>,
    sink: SharedSink,
}

struct Ticker {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Spinner {
    /// Start a spinner. With `animate` false the label is only held, nothing
    /// is drawn.
    pub fn start(label: String, sink: SharedSink, animate: bool, palette: Palette) -> Self {
        let ticker = animate.then(|| {
            let (stop, mut stopped) = oneshot::channel();
            let task_sink = Arc::clone(&sink);
            let task_label = label.clone();
            let handle = tokio::spawn(async move {
                for frame in FRAMES.iter().cycle() {
                    let line = format!("{} {task_label}", palette.color(frame, Color::Cyan));
                    draw(&task_sink, &line);
                    tokio::select! {
                        _ = &mut stopped => break,
                        () = tokio::time::sleep(TICK) => {}
                    }
                }
            });
            Ticker { stop, handle }
        });
        Self {
            label,
            ticker,
            sink,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn is_animated(&self) -> bool {
        self.ticker.is_some()
    }

    /// Stop the animation, wait for the task, and clear the line.
    pub async fn stop(mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.stop.send(());
            if let Err(e) = ticker.handle.await {
                tracing::debug!(error = %e, "spinner task ended abnormally");
            }
            draw(&self.sink, "");
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.handle.abort();
        }
    }
}

/// Replace the current terminal line with `text`.
fn draw(sink: &SharedSink, text: &str) {
    let mut guard = sink.lock();
    let out: &mut (dyn Write + Send) = &mut **guard;
    let _ = out
        .queue(MoveToColumn(0))
        .and_then(|out| out.queue(Clear(ClearType::CurrentLine)));
    let _ = write!(out, "{text}");
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sink() -> (Capture, SharedSink) {
        let capture = Capture::default();
        let boxed: Box<dyn Write + Send> = Box::new(capture.clone());
        let sink: SharedSink = Arc::new(Mutex::new(boxed));
        (capture, sink)
    }

    #[tokio::test]
    async fn static_spinner_draws_nothing() {
        let (capture, sink) = sink();
        let spinner = Spinner::start("bash ls".into(), sink, false, Palette::new(false));
        assert_eq!(spinner.label(), "bash ls");
        assert!(!spinner.is_animated());
        spinner.stop().await;
        assert!(capture.0.lock().is_empty());
    }

    #[tokio::test]
    async fn animated_spinner_draws_label_and_clears() {
        let (capture, sink) = sink();
        let spinner = Spinner::start("git status".into(), sink, true, Palette::new(false));
        tokio::time::sleep(Duration::from_millis(20)).await;
        spinner.stop().await;
        let text = String::from_utf8_lossy(&capture.0.lock()).into_owned();
        assert!(text.contains("⠋ git status"));
        // Last write is the clear sequence with no text after it.
        assert!(!text.ends_with("git status"));
    }
}

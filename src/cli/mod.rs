//! Command-line argument parsing.

use clap::Parser;

use crate::build_info;
use crate::config::Config;

/// Request used when none is given on the command line.
pub const DEFAULT_REQUEST: &str = "Review the current uncommitted changes (staged and unstaged)";

const AFTER_HELP: &str = "\
Examples:
  codereview-agent
  codereview-agent Review the last 3 commits
  codereview-agent -m gpt-4o Check PR 42 for security issues
  codereview-agent --max-steps 20 Summarize changes since main

Environment:
  OPENAI_API_KEY        API key (required; the variable name is configurable)
  OPENAI_MODEL          Model override
  OPENAI_BASE_URL       OpenAI-compatible endpoint
  CODEREVIEW_MAX_STEPS  Step budget override
  NO_COLOR              Disable coloured output
  RUST_LOG              Log filter, overrides -v";

/// LLM-powered code review assistant.
#[derive(Debug, Parser)]
#[command(name = "codereview-agent")]
#[command(about = "LLM-powered code review assistant")]
#[command(version = build_info::VERSION_STRING)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// What to review. All words are joined into one request.
    pub request: Vec<String>,

    /// Model to use (overrides config and OPENAI_MODEL).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum agent steps before giving up.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_steps: Option<u32>,

    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The request text, or [`DEFAULT_REQUEST`] when none was given.
    #[must_use]
    pub fn request_text(&self) -> String {
        let joined = self.request.join(" ");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            DEFAULT_REQUEST.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Apply flag overrides on top of loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.agent.model.clone_from(model);
        }
        if let Some(steps) = self.max_steps {
            config.agent.max_steps = steps as usize;
        }
    }

    /// Log filter for the `-v` count.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

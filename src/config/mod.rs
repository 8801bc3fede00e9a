//! Configuration management for the review agent.
//!
//! Settings are layered, later layers winning: built-in defaults, the global
//! `config.toml`, the project-local `.codereview/config.toml`, environment
//! variables, then command-line flags (applied by the caller).
//!
//! The project file lives in the repository under review, so it may only
//! choose the model and the step and token budgets. The endpoint, the key
//! variable and the sandbox limits come from the global file or environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Error;
use crate::core::sandbox::{
    DEFAULT_DISPLAY_CHARS, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT, ExecutionLimits,
};

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Environment variable holding the API key unless `api_key_env` says otherwise.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment overrides.
pub const MODEL_ENV: &str = "OPENAI_MODEL";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const MAX_STEPS_ENV: &str = "CODEREVIEW_MAX_STEPS";

const APP_DIR: &str = "codereview-agent";
const PROJECT_DIR: &str = ".codereview";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model and agent loop settings.
    pub agent: AgentConfig,

    /// Command execution bounds.
    pub sandbox: SandboxConfig,
}

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier.
    pub model: String,

    /// Step budget for one run.
    pub max_steps: usize,

    /// Completion token budget per step.
    pub max_tokens: u32,

    /// OpenAI-compatible endpoint; the public API when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_steps: agent_core::DEFAULT_MAX_STEPS,
            max_tokens: agent_core::DEFAULT_MAX_TOKENS,
            base_url: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl AgentConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationMissing`] if the variable is unset or blank.
    pub fn api_key(&self) -> Result<String, Error> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    fn api_key_from(&self, env: impl Fn(&str) -> Option<String>) -> Result<String, Error> {
        env(&self.api_key_env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::ConfigurationMissing {
                name: self.api_key_env.clone(),
            })
    }
}

/// Sandbox configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Per-command timeout in seconds.
    pub timeout_secs: u64,

    /// Bytes captured from a command or file before it is cut off.
    pub max_output_bytes: usize,

    /// Characters returned to the model before truncation.
    pub display_chars: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            display_chars: DEFAULT_DISPLAY_CHARS,
        }
    }
}

impl SandboxConfig {
    #[must_use]
    pub const fn limits(&self) -> ExecutionLimits {
        ExecutionLimits {
            timeout: Duration::from_secs(self.timeout_secs),
            max_output_bytes: self.max_output_bytes,
            display_chars: self.display_chars,
        }
    }
}

impl Config {
    /// Load configuration from the default paths and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file cannot be read or parsed, or
    /// an environment override is malformed.
    pub fn load() -> anyhow::Result<Self> {
        let global = Self::config_path().ok();
        let project = Self::project_config_path().ok();
        let mut config = Self::load_from(global.as_deref(), project.as_deref())?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load and merge the given files; missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_from(global: Option<&Path>, project: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match global {
            Some(path) if path.exists() => Self::read_file(path)?,
            _ => Self::default(),
        };

        if let Some(path) = project.filter(|p| p.exists()) {
            config.merge_project(Self::read_file(path)?);
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply `OPENAI_MODEL`, `OPENAI_BASE_URL` and `CODEREVIEW_MAX_STEPS`.
    ///
    /// Blank values are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `CODEREVIEW_MAX_STEPS` is not a positive integer.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), Error> {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        if let Some(model) = var(MODEL_ENV) {
            self.agent.model = model.trim().to_string();
        }
        if let Some(url) = var(BASE_URL_ENV) {
            self.agent.base_url = Some(url.trim().to_string());
        }
        if let Some(steps) = var(MAX_STEPS_ENV) {
            self.agent.max_steps = steps
                .trim()
                .parse()
                .ok()
                .filter(|n: &usize| *n > 0)
                .ok_or_else(|| {
                    Error::Config(format!("{MAX_STEPS_ENV} must be a positive integer, got '{steps}'"))
                })?;
        }
        Ok(())
    }

    /// Get the project-local configuration file path.
    ///
    /// Looks for `.codereview/config.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn project_config_path() -> anyhow::Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(PROJECT_DIR).join("config.toml"))
    }

    /// Merge the project file into this one. Only model and budgets are
    /// taken; other keys are ignored with a warning.
    fn merge_project(&mut self, other: Self) {
        let agent = AgentConfig::default();
        if other.agent.model != agent.model {
            self.agent.model = other.agent.model;
        }
        if other.agent.max_steps != agent.max_steps {
            self.agent.max_steps = other.agent.max_steps;
        }
        if other.agent.max_tokens != agent.max_tokens {
            self.agent.max_tokens = other.agent.max_tokens;
        }

        let ignored = [
            ("agent.base_url", other.agent.base_url.is_some()),
            ("agent.api_key_env", other.agent.api_key_env != agent.api_key_env),
            ("sandbox", other.sandbox != SandboxConfig::default()),
        ];
        for (key, set) in ignored {
            if set {
                tracing::warn!(key, "ignoring setting from project config");
            }
        }
    }

    /// Check bounds that no file may lift.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first out-of-range setting.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |key: &str, expected: String| {
            Err(Error::Config(format!("{key} must be {expected}")))
        };
        let max_timeout = DEFAULT_TIMEOUT.as_secs();
        if self.agent.max_steps == 0 {
            return invalid("agent.max_steps", "at least 1".to_string());
        }
        if !(1..=max_timeout).contains(&self.sandbox.timeout_secs) {
            return invalid("sandbox.timeout_secs", format!("between 1 and {max_timeout}"));
        }
        if !(1..=DEFAULT_MAX_OUTPUT_BYTES).contains(&self.sandbox.max_output_bytes) {
            return invalid(
                "sandbox.max_output_bytes",
                format!("between 1 and {DEFAULT_MAX_OUTPUT_BYTES}"),
            );
        }
        if self.sandbox.display_chars == 0 {
            return invalid("sandbox.display_chars", "at least 1".to_string());
        }
        Ok(())
    }

    /// Get the global configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the config directory path (`~/.config/codereview-agent/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config_home).join(APP_DIR));
        }

        if cfg!(target_os = "macos") {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home).join(".config").join(APP_DIR));
            }
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

        Ok(base.config_dir().join(APP_DIR))
    }
}

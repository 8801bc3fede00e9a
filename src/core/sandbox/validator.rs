//! Two-gate command validation.

use std::sync::Arc;

use super::policy::CommandPolicy;

/// A command that passed both gates.
///
/// Only the validator constructs these, so holding one is proof the command
/// was checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedCommand {
    normalized: String,
    invocation: String,
}

impl ApprovedCommand {
    /// The trimmed command as the model sent it.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The full line handed to the shell, with the wrapped program prefixed.
    #[must_use]
    pub fn invocation(&self) -> &str {
        &self.invocation
    }
}

/// Result of validating a raw command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Approved(ApprovedCommand),
    Rejected { reason: String },
}

impl ValidationOutcome {
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved(_))
    }
}

/// Judges commands against a [`CommandPolicy`].
#[derive(Debug, Clone)]
pub struct CommandValidator {
    policy: Arc<CommandPolicy>,
}

impl CommandValidator {
    #[must_use]
    pub const fn new(policy: Arc<CommandPolicy>) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &CommandPolicy {
        &self.policy
    }

    /// Validate `raw`.
    ///
    /// The allow-list gate checks the leading token (the subcommand for
    /// wrapped programs). The forbidden-pattern gate always runs over the
    /// whole trimmed command, so an allowed first token never exempts the
    /// rest of the line.
    #[must_use]
    pub fn validate(&self, raw: &str) -> ValidationOutcome {
        let trimmed = raw.trim();
        let body = strip_program(self.policy.program(), trimmed);
        let base = body.split_whitespace().next().unwrap_or_default();

        if !self.policy.allow_list().contains(base) {
            let reason = match self.policy.program() {
                Some(program) => format!(
                    "{program} subcommand '{base}' is not allowed. Allowed subcommands: {}",
                    self.policy.allow_list().describe()
                ),
                None => format!(
                    "Command '{base}' is not allowed. Allowed commands: {}",
                    self.policy.allow_list().describe()
                ),
            };
            tracing::warn!(command = %trimmed, "command rejected by allow-list");
            return ValidationOutcome::Rejected { reason };
        }

        if let Some(rule) = self.policy.forbidden().first_match(trimmed) {
            tracing::warn!(command = %trimmed, rule = rule.name(), "command rejected by forbidden pattern");
            return ValidationOutcome::Rejected {
                reason: format!(
                    "Command contains forbidden pattern for security reasons ({})",
                    rule.name()
                ),
            };
        }

        let invocation = match self.policy.program() {
            Some(program) => format!("{program} {body}"),
            None => trimmed.to_string(),
        };
        ValidationOutcome::Approved(ApprovedCommand {
            normalized: trimmed.to_string(),
            invocation,
        })
    }
}

/// Drop a leading `program` token so `git status` and `status` validate alike.
fn strip_program<'a>(program: Option<&str>, command: &'a str) -> &'a str {
    let Some(program) = program else {
        return command;
    };
    match command.split_once(char::is_whitespace) {
        Some((first, rest)) if first == program => rest.trim_start(),
        None if command == program => "",
        _ => command,
    }
}

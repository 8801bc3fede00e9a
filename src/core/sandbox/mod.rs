//! Command and path sandboxing for tools that touch the host.
//!
//! A command reaches the shell only as an [`ApprovedCommand`], which only
//! [`CommandValidator::validate`] produces. The [`ExecutionEngine`] then
//! bounds its runtime and output. File tools go through a [`PathGuard`].

mod executor;
mod path;
mod policy;
mod validator;

pub use executor::{
    DEFAULT_DISPLAY_CHARS, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT, EMPTY_OUTPUT,
    ExecutionEngine, ExecutionLimits, format_output,
};
pub use path::PathGuard;
pub(crate) use path::lstat;
pub use policy::{
    AllowList, BASH_COMMANDS, BASH_RULES, CommandPolicy, ForbiddenPattern, ForbiddenPatternSet,
    GH_RULES, GH_SUBCOMMANDS, GIT_RULES, GIT_SUBCOMMANDS, SHELL_RULES,
};
pub use validator::{ApprovedCommand, CommandValidator, ValidationOutcome};

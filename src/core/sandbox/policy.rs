//! Allow-lists and forbidden-pattern rules for command-style tools.
//!
//! Policies are plain values built once at startup and handed to the tools
//! that need them; nothing here is global.

use regex::Regex;

/// Read-only system commands the `bash` tool may run.
pub const BASH_COMMANDS: &[&str] = &[
    "pwd", "whoami", "hostname", "uname", "date", "env", "echo", "cat", "ls", "head", "tail", "wc",
    "which", "type", "file", "stat", "find", "tree",
];

/// Read-only git subcommands.
pub const GIT_SUBCOMMANDS: &[&str] = &[
    "status",
    "diff",
    "log",
    "show",
    "branch",
    "blame",
    "rev-parse",
    "merge-base",
    "ls-files",
    "shortlog",
    "describe",
    "tag",
    "remote",
    "reflog",
];

/// gh command groups. Mutating verbs inside them are blocked by [`GH_RULES`].
pub const GH_SUBCOMMANDS: &[&str] = &["pr", "issue", "repo", "run", "release"];

const SHELL_OPERATORS: (&str, &str) = ("shell operator or substitution", r"[;&|`$(){}]");
const PATH_TRAVERSAL: (&str, &str) = ("path traversal", r"\.\.");
const REDIRECTION: (&str, &str) = ("redirection", r"[<>]");
const NEWLINE: (&str, &str) = ("embedded newline", r"[\r\n]");

/// Rules every command tool starts from.
pub const SHELL_RULES: &[(&str, &str)] = &[SHELL_OPERATORS, PATH_TRAVERSAL, REDIRECTION, NEWLINE];

/// `bash` rules: the shell set plus programs that can run or delete on their own.
pub const BASH_RULES: &[(&str, &str)] = &[
    SHELL_OPERATORS,
    PATH_TRAVERSAL,
    REDIRECTION,
    NEWLINE,
    (
        "find action",
        r"(^|\s)-(exec|execdir|ok|okdir|delete|fprint|fprint0|fprintf|fls)(\s|$)",
    ),
    ("env command execution", r"^env\s+(-\S+\s+)*[^-\s]"),
];

/// git rules. `..` is revision-range syntax, so traversal is left to the
/// flags that actually reach the filesystem.
pub const GIT_RULES: &[(&str, &str)] = &[
    SHELL_OPERATORS,
    REDIRECTION,
    NEWLINE,
    ("config or directory override", r"(^|\s)-[cC](\s|$)"),
    (
        "helper program override",
        r"--(exec-path|upload-pack|receive-pack|ext-diff|textconv)",
    ),
    ("file output", r"(^|\s)--output(=|\s|$)"),
    ("diff outside repository", r"--no-index"),
    ("force flag", r"(^|\s)(-f|--force\S*)(\s|$)"),
    (
        "branch mutation",
        r"^(git\s+)?branch(\s.*)?\s(-[dDmMcCfu]|--delete|--move|--copy|--force|--set-upstream-to\S*|--unset-upstream|--edit-description)(\s|=|$)",
    ),
    (
        "tag mutation",
        r"^(git\s+)?tag(\s.*)?\s(-[adfmsuF]|--delete|--annotate|--sign|--force|--local-user\S*)(\s|=|$)",
    ),
    (
        "remote mutation",
        r"^(git\s+)?remote\s+(add|remove|rm|rename|set-url|set-head|set-branches|prune|update)\b",
    ),
    ("reflog mutation", r"^(git\s+)?reflog\s+(expire|delete)\b"),
];

/// gh rules: the shell set plus anything that changes remote state or opens a browser.
pub const GH_RULES: &[(&str, &str)] = &[
    SHELL_OPERATORS,
    PATH_TRAVERSAL,
    REDIRECTION,
    NEWLINE,
    (
        "mutating gh action",
        r"^(gh\s+)?\S+\s+(create|merge|close|edit|delete|comment|review|reopen|ready|lock|unlock|checkout|rerun|cancel|download|upload|transfer|pin|unpin|archive|unarchive|fork|clone|sync|rename|develop|set-default)\b",
    ),
    ("browser flag", r"(^|\s)(--web|-w)(\s|$)"),
];

/// Exhaustive set of permitted leading tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.entries.iter().any(|e| e == token)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Comma-separated listing used in rejection messages.
    #[must_use]
    pub fn describe(&self) -> String {
        self.entries.join(", ")
    }
}

/// A named rule that rejects any command it matches.
#[derive(Debug, Clone)]
pub struct ForbiddenPattern {
    name: String,
    regex: Regex,
}

impl ForbiddenPattern {
    /// Compile a rule.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            regex: Regex::new(pattern)?,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_match(&self, command: &str) -> bool {
        self.regex.is_match(command)
    }
}

/// Ordered rules; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct ForbiddenPatternSet {
    rules: Vec<ForbiddenPattern>,
}

impl ForbiddenPatternSet {
    /// Compile a rule table of `(name, pattern)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid regex.
    pub fn from_rules(rules: &[(&str, &str)]) -> Result<Self, regex::Error> {
        rules
            .iter()
            .map(|(name, pattern)| ForbiddenPattern::new(*name, pattern))
            .collect::<Result<Vec<_>, _>>()
            .map(|rules| Self { rules })
    }

    /// First rule matching `command`, if any.
    #[must_use]
    pub fn first_match(&self, command: &str) -> Option<&ForbiddenPattern> {
        self.rules.iter().find(|rule| rule.is_match(command))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Everything a validator needs to judge commands for one tool kind.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    program: Option<String>,
    allow: AllowList,
    forbidden: ForbiddenPatternSet,
}

impl CommandPolicy {
    /// Build a policy.
    ///
    /// `program` is the executable the tool wraps (`git`, `gh`); when set, the
    /// allow-list applies to its subcommands and an optional leading
    /// `program ` in the command is tolerated.
    #[must_use]
    pub fn new(program: Option<&str>, allow: AllowList, forbidden: ForbiddenPatternSet) -> Self {
        let name = program.unwrap_or("sh");
        if forbidden.is_empty() {
            tracing::warn!(program = name, "command policy has no forbidden patterns");
        } else {
            tracing::debug!(program = name, rules = forbidden.len(), "command policy ready");
        }
        Self {
            program: program.map(String::from),
            allow,
            forbidden,
        }
    }

    /// Policy for the general-purpose `bash` tool.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in rule fails to compile.
    pub fn bash() -> Result<Self, regex::Error> {
        Ok(Self::new(
            None,
            AllowList::new(BASH_COMMANDS.iter().copied()),
            ForbiddenPatternSet::from_rules(BASH_RULES)?,
        ))
    }

    /// Policy for read-only git subcommands.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in rule fails to compile.
    pub fn git() -> Result<Self, regex::Error> {
        Ok(Self::new(
            Some("git"),
            AllowList::new(GIT_SUBCOMMANDS.iter().copied()),
            ForbiddenPatternSet::from_rules(GIT_RULES)?,
        ))
    }

    /// Policy for read-only GitHub CLI queries.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in rule fails to compile.
    pub fn gh() -> Result<Self, regex::Error> {
        Ok(Self::new(
            Some("gh"),
            AllowList::new(GH_SUBCOMMANDS.iter().copied()),
            ForbiddenPatternSet::from_rules(GH_RULES)?,
        ))
    }

    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    #[must_use]
    pub const fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    #[must_use]
    pub const fn forbidden(&self) -> &ForbiddenPatternSet {
        &self.forbidden
    }
}

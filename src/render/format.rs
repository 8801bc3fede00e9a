//! Labels, previews and colour for terminal output.

use crossterm::style::{Attribute, Color, Stylize};
use serde_json::Value;

/// Lines of a successful result shown under its label.
pub const PREVIEW_LINES: usize = 8;

/// Lines of a failed result shown under its label.
pub const ERROR_PREVIEW_LINES: usize = 3;

/// Characters per preview line before it is cut with `...`.
pub const PREVIEW_LINE_CHARS: usize = 100;

/// Width of the header and footer rule.
pub const RULE_WIDTH: usize = 50;

/// Optional ANSI styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Colour unless `NO_COLOR` is set or output is not a terminal.
    #[must_use]
    pub fn detect(is_terminal: bool) -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::new(is_terminal && !no_color)
    }

    #[must_use]
    pub const fn enabled(self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn color(self, text: &str, color: Color) -> String {
        if self.enabled {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    #[must_use]
    pub fn dim(self, text: &str) -> String {
        self.attribute(text, Attribute::Dim)
    }

    #[must_use]
    pub fn bold(self, text: &str) -> String {
        self.attribute(text, Attribute::Bold)
    }

    fn attribute(self, text: &str, attribute: Attribute) -> String {
        if self.enabled {
            text.attribute(attribute).to_string()
        } else {
            text.to_string()
        }
    }
}

/// One-line label for a tool call, e.g. `git diff --staged`.
#[must_use]
pub fn format_tool_call(name: &str, args: &Value) -> String {
    let key = match name {
        "bash" | "git" | "gh" => "command",
        "read_file" | "write_file" => "path",
        _ => return name.to_string(),
    };
    let detail = args.get(key).and_then(Value::as_str).unwrap_or_default();
    let detail = detail.split_whitespace().collect::<Vec<_>>().join(" ");
    if detail.is_empty() {
        name.to_string()
    } else {
        format!("{name} {detail}")
    }
}

/// Indented preview of the first `max_lines` lines of `result`.
///
/// Returns an empty string for blank results.
#[must_use]
pub fn format_result_preview(result: &str, max_lines: usize, palette: Palette) -> String {
    let trimmed = result.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    let mut out = String::new();
    for line in lines.iter().take(max_lines) {
        let shown = if line.chars().count() > PREVIEW_LINE_CHARS {
            let head: String = line.chars().take(PREVIEW_LINE_CHARS).collect();
            format!("{head}...")
        } else {
            (*line).to_string()
        };
        out.push_str(&palette.dim(&format!("  │ {shown}")));
        out.push('\n');
    }
    if lines.len() > max_lines {
        let more = lines.len() - max_lines;
        out.push_str(&palette.dim(&format!("  │ ... ({more} more lines)")));
        out.push('\n');
    }
    out
}

/// Horizontal rule used by the header and footer.
#[must_use]
pub fn rule() -> String {
    "─".repeat(RULE_WIDTH)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const PLAIN: Palette = Palette::new(false);

    #[test]
    fn labels_by_tool_kind() {
        assert_eq!(
            format_tool_call("git", &json!({"command": "diff --staged"})),
            "git diff --staged"
        );
        assert_eq!(
            format_tool_call("read_file", &json!({"path": "src/lib.rs"})),
            "read_file src/lib.rs"
        );
        assert_eq!(format_tool_call("custom", &json!({"x": 1})), "custom");
        assert_eq!(format_tool_call("bash", &json!({})), "bash");
    }

    #[test]
    fn labels_stay_on_one_line() {
        assert_eq!(
            format_tool_call("bash", &json!({"command": "echo a\nrm -rf /"})),
            "bash echo a rm -rf /"
        );
    }

    #[test]
    fn preview_limits_lines() {
        let result = (1..=10).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let preview = format_result_preview(&result, PREVIEW_LINES, PLAIN);
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "  │ 1");
        assert_eq!(lines[7], "  │ 8");
        assert_eq!(lines[8], "  │ ... (2 more lines)");
    }

    #[test]
    fn preview_cuts_long_lines() {
        let preview = format_result_preview(&"z".repeat(150), ERROR_PREVIEW_LINES, PLAIN);
        assert_eq!(preview, format!("  │ {}...\n", "z".repeat(100)));
    }

    #[test]
    fn blank_result_has_no_preview() {
        assert_eq!(format_result_preview(" \n\t", PREVIEW_LINES, PLAIN), "");
    }

    #[test]
    fn disabled_palette_is_plain() {
        assert_eq!(PLAIN.color("x", Color::Red), "x");
        assert_eq!(PLAIN.bold("x"), "x");
        let colored = Palette::new(true).color("x", Color::Red);
        assert!(colored.contains('\u{1b}'));
    }

    #[test]
    fn rule_width() {
        assert_eq!(rule().chars().count(), RULE_WIDTH);
    }
}

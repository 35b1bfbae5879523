//! Output contract of the agent child.
//!
//! The child reads one prompt from stdin and prints human-readable progress
//! to stdout. The console only understands these lines, so their shape is
//! fixed here and shared by both sides.

use std::io::{IsTerminal, Read};

use chrono::{DateTime, Local};

use crate::log_line::TOOL_CALLS_MARKER;

/// Prompt used when stdin is a terminal or empty.
pub const DEFAULT_PROMPT: &str = "Hello, agent!";

/// Final line printed after a run.
pub const COMPLETION_LINE: &str = "--- Task completed successfully ---";

/// Read the prompt from stdin.
///
/// Falls back to [`DEFAULT_PROMPT`] when stdin is interactive or carries no
/// text.
pub fn read_prompt() -> std::io::Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(DEFAULT_PROMPT.to_string());
    }
    let mut raw = String::new();
    stdin.lock().read_to_string(&mut raw)?;
    Ok(prompt_or_default(&raw))
}

/// Trim the raw input, substituting the default greeting when empty.
pub fn prompt_or_default(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Append a screenshot file name when the prompt asks for a screenshot.
pub fn prepare_prompt(prompt: &str, now: DateTime<Local>) -> String {
    if prompt.to_lowercase().contains("screenshot") {
        let file_name = format!("screenshot_{}.png", now.format("%Y%m%d_%H%M%S"));
        format!("{} (Save screenshot as {})", prompt, file_name)
    } else {
        prompt.to_string()
    }
}

/// Header line echoing the prompt.
pub fn user_header(prompt: &str) -> String {
    format!("# User: '{}'", prompt)
}

/// Line announcing a completed tool-call step.
pub fn tool_calls_line(data: &str) -> String {
    format!("{}  {}", TOOL_CALLS_MARKER, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_line::LogLine;
    use chrono::TimeZone;

    #[test]
    fn test_prompt_or_default() {
        assert_eq!(prompt_or_default("  open example.com \n"), "open example.com");
        assert_eq!(prompt_or_default(""), DEFAULT_PROMPT);
        assert_eq!(prompt_or_default(" \n\t"), DEFAULT_PROMPT);
    }

    #[test]
    fn test_prepare_prompt_adds_screenshot_name() {
        let now = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let prompt = prepare_prompt("Take a Screenshot of the home page", now);
        assert_eq!(
            prompt,
            "Take a Screenshot of the home page (Save screenshot as screenshot_20250314_092653.png)"
        );
    }

    #[test]
    fn test_prepare_prompt_leaves_other_prompts() {
        let now = Local::now();
        assert_eq!(prepare_prompt("click login", now), "click login");
    }

    #[test]
    fn test_user_header() {
        assert_eq!(user_header("hi"), "# User: 'hi'");
    }

    #[test]
    fn test_tool_calls_line_is_classified_as_tool_call() {
        let line = tool_calls_line(r#"[{"name":"browser_click"}]"#);
        assert!(line.starts_with("Tool calls: "));
        assert!(LogLine::classify(line).is_tool_call());
    }

    #[test]
    fn test_completion_line_is_a_message() {
        assert!(!LogLine::classify(COMPLETION_LINE).is_tool_call());
    }
}

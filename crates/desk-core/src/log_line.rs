//! Classification of agent output lines.
//!
//! The agent child prints tool-call steps as lines carrying a fixed marker.
//! Everything else is conversational text.

/// Marker the agent child prints in front of tool-call data.
///
/// Must match the agent's output byte-for-byte.
pub const TOOL_CALLS_MARKER: &str = "Tool calls:";

/// What a line of agent output represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// A completed tool-call step.
    ToolCall,
    /// Conversational text.
    Message,
}

/// One line of agent output with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Raw text as printed by the agent.
    pub text: String,
    /// Classification.
    pub kind: LogKind,
}

impl LogLine {
    /// Classify a raw line.
    pub fn classify(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = if text.contains(TOOL_CALLS_MARKER) {
            LogKind::ToolCall
        } else {
            LogKind::Message
        };
        Self { text, kind }
    }

    /// Returns true if this line is a tool-call record.
    pub fn is_tool_call(&self) -> bool {
        self.kind == LogKind::ToolCall
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_line() {
        let line = LogLine::classify("Tool calls: [{'name': 'browser_click'}]");
        assert_eq!(line.kind, LogKind::ToolCall);
        assert!(line.is_tool_call());
    }

    #[test]
    fn test_plain_message() {
        let line = LogLine::classify("I clicked the button.");
        assert_eq!(line.kind, LogKind::Message);
        assert_eq!(line.text, "I clicked the button.");
    }

    #[test]
    fn test_marker_anywhere_in_line() {
        assert!(LogLine::classify("step 3 -> Tool calls:  []").is_tool_call());
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        assert!(!LogLine::classify("tool calls: [...]").is_tool_call());
        assert!(!LogLine::classify("TOOL CALLS: [...]").is_tool_call());
    }

    #[test]
    fn test_marker_needs_colon() {
        assert!(!LogLine::classify("Tool calls were made").is_tool_call());
    }

    #[test]
    fn test_empty_line_is_message() {
        assert_eq!(LogLine::classify("").kind, LogKind::Message);
    }
}

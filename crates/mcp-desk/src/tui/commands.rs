//! Slash commands for the console.

use super::app::App;

/// Names `handle_command` understands. Other `/...` input is a prompt.
const COMMANDS: &[&str] = &[
    "help", "h", "?", "start", "stop", "status", "clear", "quit", "q", "exit",
];

/// Whether `cmd` (the text after `/`) names a console command.
pub(super) fn is_command(cmd: &str) -> bool {
    let name = cmd.split_whitespace().next().unwrap_or("").to_lowercase();
    COMMANDS.contains(&name.as_str())
}

impl App {
    /// Handle a slash command.
    pub(super) fn handle_command(&mut self, cmd: &str) {
        let command = cmd.split_whitespace().next().unwrap_or("").to_lowercase();

        match command.as_str() {
            "help" | "h" | "?" => self.show_help(),
            "start" => self.start_server(),
            "stop" => self.stop_server(),
            "clear" => self.clear_surfaces(),
            "status" => {
                let pid = self
                    .supervisor
                    .pid()
                    .map(|p| format!("running (pid {})", p))
                    .unwrap_or_else(|| "not running".to_string());
                self.push_chat(format!("MCP Server: {}", pid));
                self.push_chat(format!("  command: {}", self.supervisor.command()));
                self.push_chat(format!("Agent: {}", self.runner.command()));
                self.push_chat(format!("  running sessions: {}", self.running_sessions()));
            }
            "quit" | "q" | "exit" => self.quit(),
            "" => self.push_chat("Type /help for commands"),
            other => self.push_chat(format!("Unknown command: /{}. Type /help for commands.", other)),
        }
    }

    fn show_help(&mut self) {
        self.push_chat("=== Commands ===");
        self.push_chat("  /start     Start the MCP server (F1)");
        self.push_chat("  /stop      Stop the MCP server (F2)");
        self.push_chat("  /status    Show server and agent state");
        self.push_chat("  /clear     Clear both panes (Ctrl+L)");
        self.push_chat("  /quit      Stop the server and exit");
        self.push_chat("  //text     Send a prompt that starts with /");
        self.push_chat("");
        self.push_chat("=== Keyboard ===");
        self.push_chat("  Enter       Run prompt");
        self.push_chat("  Tab         Switch scrolled pane");
        self.push_chat("  Up/Down     Scroll one line");
        self.push_chat("  PgUp/PgDn   Scroll a page");
        self.push_chat("  Ctrl+C/Esc  Quit");
    }
}

//! Console state and event routing.

use std::collections::BTreeSet;

use desk_core::{CommandSpec, DeskConfig, LogKind, LogLine};
use desk_runtime::{ServiceStatus, ServiceSupervisor, SessionEvent, SessionId, SessionRunner};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, info};

use crate::server_log_file;

/// Shown when the operator submits nothing.
pub const EMPTY_PROMPT_WARNING: &str = "Please enter a prompt for UI automation.";

/// Shown right after a session is dispatched.
pub const AGENT_STARTING: &str = "[Agent] Starting agent and initializing... (please wait)";

/// One of the two display surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surface {
    /// Agent dialogue and lifecycle messages.
    #[default]
    Chat,
    /// Tool-call records.
    Tools,
}

impl Surface {
    /// The other surface.
    pub fn toggled(self) -> Self {
        match self {
            Surface::Chat => Surface::Tools,
            Surface::Tools => Surface::Chat,
        }
    }
}

/// Console application state.
pub struct App {
    // Processes
    /// Automation server supervisor
    pub supervisor: ServiceSupervisor,
    /// Agent session launcher
    pub runner: SessionRunner,
    events_rx: UnboundedReceiver<SessionEvent>,
    /// Sessions dispatched and not yet finished
    pub active_sessions: BTreeSet<SessionId>,

    // Surfaces
    /// Latest server status text
    pub status: String,
    /// Conversational log
    pub chat: Vec<String>,
    /// Tool-activity log
    pub tools: Vec<String>,

    // UI state
    /// Current input text
    pub input: String,
    /// Cursor position in input, in characters
    pub cursor_pos: usize,
    /// Surface that receives scroll keys
    pub focus: Surface,
    /// Chat scroll offset (0 = bottom)
    pub chat_scroll: usize,
    /// Tool Calls scroll offset (0 = bottom)
    pub tools_scroll: usize,
    /// Whether the app should quit
    pub should_quit: bool,
}

impl App {
    /// Create the console from configuration.
    pub fn new(config: &DeskConfig, handle: Handle) -> desk_core::Result<Self> {
        let supervisor =
            ServiceSupervisor::new(config.service_command()).with_log_file(server_log_file());
        let agent = config.agent_command()?;
        Ok(Self::with_parts(supervisor, agent, handle))
    }

    /// Create the console from an explicit supervisor and agent command.
    pub fn with_parts(supervisor: ServiceSupervisor, agent: CommandSpec, handle: Handle) -> Self {
        let (tx, events_rx) = unbounded_channel();
        let runner = SessionRunner::new(agent, handle, tx);

        Self {
            supervisor,
            runner,
            events_rx,
            active_sessions: BTreeSet::new(),

            status: "Idle".to_string(),
            chat: Vec::new(),
            tools: Vec::new(),

            input: String::new(),
            cursor_pos: 0,
            focus: Surface::Chat,
            chat_scroll: 0,
            tools_scroll: 0,
            should_quit: false,
        }
    }

    /// Start the automation server.
    pub fn start_server(&mut self) {
        let status = self.supervisor.start();
        self.on_status(&status);
    }

    /// Stop the automation server.
    pub fn stop_server(&mut self) {
        let status = self.supervisor.stop();
        self.on_status(&status);
    }

    /// Record a server lifecycle status.
    pub fn on_status(&mut self, status: &ServiceStatus) {
        info!(status = %status, "server status");
        self.status = status.to_string();
        self.push_chat(format!("[MCP] {}", status));
    }

    /// Dispatch a prompt to a new agent session.
    ///
    /// Blank prompts only produce a warning. Returns whether a session was
    /// started.
    pub fn run_prompt(&mut self, prompt: &str) -> bool {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            self.push_chat(EMPTY_PROMPT_WARNING);
            return false;
        }

        self.push_chat(format!("[Prompt] {}", prompt));
        match self.runner.run(prompt) {
            Ok(session_id) => {
                self.active_sessions.insert(session_id);
                self.push_chat(AGENT_STARTING);
                true
            }
            Err(e) => {
                self.push_chat(format!("[Agent Exception] {}", e));
                false
            }
        }
    }

    /// Route one agent output line to its surface.
    pub fn on_line(&mut self, text: impl Into<String>) {
        let line = LogLine::classify(text);
        match line.kind {
            LogKind::ToolCall => self.push_tools(line.text),
            LogKind::Message => self.push_chat(line.text),
        }
    }

    /// Apply one session event.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Started {
                session_id, pid, ..
            } => {
                debug!(session = %session_id, pid = ?pid, "agent session started");
            }
            SessionEvent::Line { text, .. } => self.on_line(text),
            SessionEvent::AgentError { stderr, .. } => {
                self.push_chat(format!("[Agent Error] {}", stderr));
            }
            SessionEvent::AgentException { error, .. } => {
                self.push_chat(format!("[Agent Exception] {}", error));
            }
            SessionEvent::Finished { session_id, status } => {
                debug!(session = %session_id, status = ?status, "agent session finished");
                self.active_sessions.remove(&session_id);
            }
        }
    }

    /// Apply every event that has arrived so far. Returns how many.
    pub fn drain_events(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            count += 1;
        }
        count
    }

    /// Number of agent sessions still running.
    pub fn running_sessions(&self) -> usize {
        self.active_sessions.len()
    }

    /// Empty both surfaces. Running processes are untouched.
    pub fn clear_surfaces(&mut self) {
        self.chat.clear();
        self.tools.clear();
        self.chat_scroll = 0;
        self.tools_scroll = 0;
    }

    /// Stop the server if it is running and leave the event loop.
    pub fn quit(&mut self) {
        if self.supervisor.is_running() {
            self.stop_server();
        }
        self.should_quit = true;
    }

    /// Append to the chat surface, one entry per line of `text`.
    pub fn push_chat(&mut self, text: impl Into<String>) {
        let text = text.into();
        push_lines(&mut self.chat, &text);
        self.chat_scroll = 0;
    }

    /// Append to the tool surface.
    pub fn push_tools(&mut self, text: impl Into<String>) {
        let text = text.into();
        push_lines(&mut self.tools, &text);
        self.tools_scroll = 0;
    }
}

fn push_lines(surface: &mut Vec<String>, text: &str) {
    let text = text.trim_end();
    if text.is_empty() {
        surface.push(String::new());
        return;
    }
    surface.extend(text.lines().map(String::from));
}

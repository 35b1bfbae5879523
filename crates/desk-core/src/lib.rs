//! Desk Core - shared pieces for the mcp-desk console and its agent child.
//!
//! - **config**: environment-driven configuration and `.env` loading
//! - **command**: program + argument specs for the processes we launch
//! - **log_line**: classification of agent output into chat vs. tool activity
//! - **transcript**: the line-oriented output contract of the agent child
//! - **hosted_agent**: thin client for the hosted chat-completions agent

pub mod command;
pub mod config;
pub mod error;
pub mod hosted_agent;
pub mod log_line;
pub mod transcript;

pub use command::CommandSpec;
pub use config::{load_env, logs_dir, state_dir, DeskConfig};
pub use error::{ConfigError, Result};
pub use hosted_agent::{AgentReply, AgentSettings, HostedAgentError, ToolCall};
pub use log_line::{LogKind, LogLine, TOOL_CALLS_MARKER};
pub use transcript::{prepare_prompt, read_prompt, tool_calls_line, DEFAULT_PROMPT};

//! mcp-desk console library.
//!
//! This crate provides the command-line interface, the interactive console
//! and the built-in agent child.

pub mod agent_cli;
pub mod cli;
pub mod commands;
pub mod tui;

use std::path::PathBuf;

/// Log file used while the console owns the terminal.
pub fn console_log_file() -> PathBuf {
    desk_core::logs_dir().join("mcp-desk.log")
}

/// Where the automation server's own output goes.
pub fn server_log_file() -> PathBuf {
    desk_core::logs_dir().join("mcp-server.log")
}

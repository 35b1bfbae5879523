//! Terminal console for mcp-desk.
//!
//! Layout:
//! - Header and status bar (server status, running agent sessions)
//! - Prompt input
//! - Chat surface for agent dialogue and lifecycle messages
//! - Tool Calls surface for tool-call records
//! - Footer with keybindings

mod app;
mod commands;
mod events;
mod input;
mod scroll;
mod ui;

pub use app::{App, Surface};
pub use events::run;

//! Process runtime for mcp-desk.
//!
//! This crate owns every child process mcp-desk launches:
//! - `ServiceSupervisor` - starts and stops the long-running automation server
//! - `SessionRunner` - runs one agent child per prompt and streams its output
//!
//! # Example
//!
//! ```ignore
//! use desk_core::DeskConfig;
//! use desk_runtime::{SessionEvent, SessionRunner, ServiceSupervisor};
//!
//! let config = DeskConfig::from_env();
//! let mut supervisor = ServiceSupervisor::new(config.service_command());
//! println!("{}", supervisor.start());
//!
//! let rt = tokio::runtime::Runtime::new()?;
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let runner = SessionRunner::new(config.agent_command()?, rt.handle().clone(), tx);
//! runner.run("open example.com")?;
//!
//! while let Some(event) = rx.blocking_recv() {
//!     if let SessionEvent::Line { text, .. } = &event {
//!         println!("{}", text);
//!     }
//!     if event.is_finished() {
//!         break;
//!     }
//! }
//! ```
//!
//! # Key Concepts
//!
//! ## ServiceSupervisor
//!
//! Tracks at most one automation server. Liveness is re-polled before every
//! start and stop, so the tracked handle never outlives the process by more
//! than one call. Every call returns a [`ServiceStatus`] for display.
//!
//! ## SessionRunner
//!
//! Each run spawns its own child and its own background task. The task writes
//! the prompt once, closes stdin, and forwards stdout line by line over an
//! unbounded channel, so lines arrive in the order the child wrote them.
//! Concurrent runs are independent and may interleave on the receiver.
//!
//! ## McpClient
//!
//! Used by the built-in agent child, not the console: drives a tool server
//! over stdio with JSON-RPC (`initialize`, `tools/list`, `tools/call`).

pub mod error;
pub mod event;
pub mod mcp;
pub mod service;
pub mod session;

pub use error::{Result, RuntimeError};
pub use event::{ServiceStatus, SessionEvent, SessionId, SessionStatus};
pub use mcp::{McpClient, McpTool, ToolOutput};
pub use service::ServiceSupervisor;
pub use session::{drive_session, SessionRunner};

//! Error types for the runtime crate.

use thiserror::Error;

/// Errors that can occur in the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Prompt was empty or whitespace only.
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Event channel closed.
    #[error("channel error: {0}")]
    Channel(String),

    /// Tool server launch, transport or protocol failure.
    #[error("tool server error: {0}")]
    Mcp(String),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

//! Runtime events and statuses.

use std::fmt;

use chrono::{DateTime, Utc};

/// Identifies one agent session within a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Completion status of an agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Succeeded,
    Failed,
}

/// Events emitted while an agent session runs.
///
/// For a single session the order is: `Started` (unless the launch failed),
/// zero or more `Line`, at most one of `AgentError`/`AgentException`, then
/// exactly one `Finished`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The child process was spawned.
    Started {
        session_id: SessionId,
        /// OS process id, when known.
        pid: Option<u32>,
        started_at: DateTime<Utc>,
    },
    /// One line of child stdout, trailing whitespace removed.
    Line { session_id: SessionId, text: String },
    /// Child exited non-zero; carries its complete stderr.
    AgentError { session_id: SessionId, stderr: String },
    /// The runner itself failed (launch, pipe I/O).
    AgentException { session_id: SessionId, error: String },
    /// Session is over.
    Finished {
        session_id: SessionId,
        status: SessionStatus,
    },
}

impl SessionEvent {
    /// Returns the session this event belongs to.
    pub fn session_id(&self) -> SessionId {
        match self {
            SessionEvent::Started { session_id, .. } => *session_id,
            SessionEvent::Line { session_id, .. } => *session_id,
            SessionEvent::AgentError { session_id, .. } => *session_id,
            SessionEvent::AgentException { session_id, .. } => *session_id,
            SessionEvent::Finished { session_id, .. } => *session_id,
        }
    }

    /// Returns true for the terminal event of a session.
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionEvent::Finished { .. })
    }

    /// Returns true for error and exception events.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SessionEvent::AgentError { .. } | SessionEvent::AgentException { .. }
        )
    }
}

/// Outcome of a supervisor start/stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    Started,
    AlreadyRunning,
    Stopped,
    NotRunning,
    FailedToStart(String),
}

impl ServiceStatus {
    /// Returns true if the status reports a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, ServiceStatus::FailedToStart(_))
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Started => write!(f, "MCP Server started."),
            ServiceStatus::AlreadyRunning => write!(f, "MCP Server already running."),
            ServiceStatus::Stopped => write!(f, "MCP Server stopped."),
            ServiceStatus::NotRunning => write!(f, "MCP Server not running."),
            ServiceStatus::FailedToStart(reason) => {
                write!(f, "MCP Server failed to start: {}", reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_session_id() {
        let id = SessionId(7);
        let events = [
            SessionEvent::Started {
                session_id: id,
                pid: Some(1),
                started_at: Utc::now(),
            },
            SessionEvent::Line {
                session_id: id,
                text: "hello".to_string(),
            },
            SessionEvent::AgentError {
                session_id: id,
                stderr: "boom".to_string(),
            },
            SessionEvent::AgentException {
                session_id: id,
                error: "not found".to_string(),
            },
            SessionEvent::Finished {
                session_id: id,
                status: SessionStatus::Failed,
            },
        ];
        for event in &events {
            assert_eq!(event.session_id(), id);
        }
    }

    #[test]
    fn test_event_predicates() {
        let id = SessionId(1);
        let line = SessionEvent::Line {
            session_id: id,
            text: String::new(),
        };
        assert!(!line.is_error());
        assert!(!line.is_finished());

        let err = SessionEvent::AgentError {
            session_id: id,
            stderr: String::new(),
        };
        assert!(err.is_error());

        let done = SessionEvent::Finished {
            session_id: id,
            status: SessionStatus::Succeeded,
        };
        assert!(done.is_finished());
    }

    #[test]
    fn test_service_status_text() {
        assert_eq!(ServiceStatus::Started.to_string(), "MCP Server started.");
        assert_eq!(ServiceStatus::AlreadyRunning.to_string(), "MCP Server already running.");
        assert_eq!(ServiceStatus::Stopped.to_string(), "MCP Server stopped.");
        assert_eq!(ServiceStatus::NotRunning.to_string(), "MCP Server not running.");
        let failed = ServiceStatus::FailedToStart("no such file".to_string());
        assert_eq!(failed.to_string(), "MCP Server failed to start: no such file");
        assert!(failed.is_failure());
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(3).to_string(), "#3");
    }
}

//! Agent session runner.
//!
//! One session = one child process fed a single prompt. Output is relayed
//! line by line from a background task so the caller never blocks on it.

use std::io;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use desk_core::CommandSpec;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::{Result, RuntimeError};
use crate::event::{SessionEvent, SessionId, SessionStatus};

/// Launches agent sessions on a tokio runtime and reports their events.
pub struct SessionRunner {
    command: CommandSpec,
    handle: Handle,
    events: UnboundedSender<SessionEvent>,
    next_id: AtomicU64,
}

impl SessionRunner {
    /// Creates a runner that launches `command` for every prompt.
    pub fn new(command: CommandSpec, handle: Handle, events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            command,
            handle,
            events,
            next_id: AtomicU64::new(0),
        }
    }

    /// Returns the agent command.
    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Start a session for `prompt` with the configured agent command.
    pub fn run(&self, prompt: &str) -> Result<SessionId> {
        self.run_with(prompt, &self.command)
    }

    /// Start a session for `prompt` with an explicit agent command.
    ///
    /// Returns immediately; progress arrives on the event channel. Blank
    /// prompts are rejected before anything is spawned.
    pub fn run_with(&self, prompt: &str, command: &CommandSpec) -> Result<SessionId> {
        if prompt.trim().is_empty() {
            return Err(RuntimeError::EmptyPrompt);
        }
        if self.events.is_closed() {
            return Err(RuntimeError::Channel("event receiver dropped".to_string()));
        }

        let session_id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let prompt = prompt.to_string();
        let command = command.clone();
        let events = self.events.clone();

        debug!(session = %session_id, command = %command, "dispatching agent session");
        self.handle.spawn(async move {
            drive_session(session_id, &prompt, &command, &events).await;
        });

        Ok(session_id)
    }
}

/// Run one session to completion, emitting its events.
///
/// Never fails: launch and I/O errors become an `AgentException` event.
/// The last event is always `Finished`.
pub async fn drive_session(
    session_id: SessionId,
    prompt: &str,
    command: &CommandSpec,
    events: &UnboundedSender<SessionEvent>,
) -> SessionStatus {
    let status = match stream_child(session_id, prompt, command, events).await {
        Ok(status) => status,
        Err(e) => {
            warn!(session = %session_id, error = %e, "agent session failed");
            emit(
                events,
                SessionEvent::AgentException {
                    session_id,
                    error: e.to_string(),
                },
            );
            SessionStatus::Failed
        }
    };

    info!(session = %session_id, status = ?status, "agent session finished");
    emit(events, SessionEvent::Finished { session_id, status });
    status
}

async fn stream_child(
    session_id: SessionId,
    prompt: &str,
    command: &CommandSpec,
    events: &UnboundedSender<SessionEvent>,
) -> io::Result<SessionStatus> {
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("failed to launch {}: {}", command.program.display(), e),
            )
        })?;

    emit(
        events,
        SessionEvent::Started {
            session_id,
            pid: child.id(),
            started_at: Utc::now(),
        },
    );

    // Drained concurrently so a full stderr pipe cannot stall stdout.
    let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(read_all(stderr)));

    if let Some(stdin) = child.stdin.take() {
        write_prompt(stdin, prompt).await?;
    }

    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&buf).trim_end().to_string();
            emit(events, SessionEvent::Line { session_id, text });
        }
    }

    let exit = child.wait().await?;
    debug!(session = %session_id, status = %exit, "agent child exited");

    if exit.success() {
        return Ok(SessionStatus::Succeeded);
    }

    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };
    emit(events, SessionEvent::AgentError { session_id, stderr });
    Ok(SessionStatus::Failed)
}

/// Write `prompt` plus newline in one write, then close stdin.
///
/// A child that exits without reading its input is not an error here; its
/// exit status tells the story.
async fn write_prompt(mut stdin: ChildStdin, prompt: &str) -> io::Result<()> {
    let payload = format!("{}\n", prompt);
    let result = async {
        stdin.write_all(payload.as_bytes()).await?;
        stdin.flush().await
    }
    .await;
    drop(stdin);

    match result {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("agent closed stdin before reading the prompt");
            Ok(())
        }
        other => other,
    }
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        debug!(error = %e, "error reading agent stderr");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn emit(events: &UnboundedSender<SessionEvent>, event: SessionEvent) {
    // Receiver gone means nobody is watching anymore.
    let _ = events.send(event);
}

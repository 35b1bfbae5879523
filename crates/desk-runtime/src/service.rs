//! Supervisor for the long-running automation server.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use desk_core::CommandSpec;
use tracing::{debug, info, warn};

use crate::event::ServiceStatus;

/// Starts, stops and tracks a single automation server process.
///
/// The supervisor is the only owner of the process handle. Methods take
/// `&mut self`, so callers that need sharing across threads must wrap it.
#[derive(Debug)]
pub struct ServiceSupervisor {
    command: CommandSpec,
    log_file: Option<PathBuf>,
    child: Option<Child>,
}

impl ServiceSupervisor {
    /// Creates a supervisor for the given command. Nothing is spawned yet.
    pub fn new(command: CommandSpec) -> Self {
        Self {
            command,
            log_file: None,
            child: None,
        }
    }

    /// Sends server stdout/stderr to a file instead of discarding it.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Returns the launch command.
    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Re-polls the tracked process, clearing the handle if it has exited.
    pub fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                info!(pid = child.id(), status = %status, "automation server exited");
                self.child = None;
                false
            }
            Err(e) => {
                warn!(pid = child.id(), error = %e, "failed to poll automation server");
                self.child = None;
                false
            }
        }
    }

    /// Process id of the live server, if any.
    pub fn pid(&mut self) -> Option<u32> {
        if self.is_running() {
            self.child.as_ref().map(|c| c.id())
        } else {
            None
        }
    }

    /// Start the server unless a live one is already tracked.
    pub fn start(&mut self) -> ServiceStatus {
        if self.is_running() {
            return ServiceStatus::AlreadyRunning;
        }

        debug!(command = %self.command, "starting automation server");

        let (stdout, stderr) = self.output_stdio();
        let spawned = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn();

        match spawned {
            Ok(child) => {
                info!(pid = child.id(), command = %self.command, "automation server started");
                self.child = Some(child);
                ServiceStatus::Started
            }
            Err(e) => {
                warn!(command = %self.command, error = %e, "failed to start automation server");
                ServiceStatus::FailedToStart(format!(
                    "{}: {}",
                    self.command.program.display(),
                    e
                ))
            }
        }
    }

    /// Ask a live server to terminate and forget it.
    ///
    /// Termination is not awaited; the process is reaped in the background.
    pub fn stop(&mut self) -> ServiceStatus {
        if !self.is_running() {
            return ServiceStatus::NotRunning;
        }
        let Some(child) = self.child.take() else {
            return ServiceStatus::NotRunning;
        };

        info!(pid = child.id(), "stopping automation server");
        terminate(child);
        ServiceStatus::Stopped
    }

    fn output_stdio(&self) -> (Stdio, Stdio) {
        let Some(path) = &self.log_file else {
            return (Stdio::null(), Stdio::null());
        };

        match open_log(path).and_then(|f| f.try_clone().map(|out| (out, f))) {
            Ok((out, err)) => (Stdio::from(out), Stdio::from(err)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open server log, discarding output");
                (Stdio::null(), Stdio::null())
            }
        }
    }
}

fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Request graceful termination and reap the child on a detached thread.
fn terminate(mut child: Child) {
    #[cfg(unix)]
    {
        let sent = Command::new("kill")
            .args(["-TERM", &child.id().to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !sent {
            let _ = child.kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }

    thread::spawn(move || match child.wait() {
        Ok(status) => debug!(status = %status, "automation server reaped"),
        Err(e) => debug!(error = %e, "failed to reap automation server"),
    });
}

impl Drop for ServiceSupervisor {
    fn drop(&mut self) {
        if let Some(child) = self.child.take() {
            terminate(child);
        }
    }
}

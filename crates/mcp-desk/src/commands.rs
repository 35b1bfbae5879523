//! Non-interactive command handlers.

use std::path::PathBuf;
use std::time::Duration;

use desk_core::{CommandSpec, DeskConfig};
use desk_runtime::{ServiceSupervisor, SessionEvent, SessionRunner, SessionStatus};
use tokio::sync::mpsc::unbounded_channel;
use tracing::debug;

use crate::cli::Commands;
use crate::server_log_file;

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Execute a non-interactive command.
pub fn execute(command: Commands, config: &DeskConfig) -> Result<()> {
    match command {
        Commands::Run { prompt, agent } => run_prompt(config, &prompt, agent),
        Commands::StartServer => serve(config),
        Commands::Config => show_config(config),
        Commands::Tui | Commands::Agent => Err("command must be dispatched by main".into()),
    }
}

/// Run one agent session and print its output.
///
/// Agent lines go to stdout verbatim; error and exception reports go to
/// stderr. Fails when the session did not succeed.
fn run_prompt(config: &DeskConfig, prompt: &str, agent: Option<PathBuf>) -> Result<()> {
    let command = match agent {
        Some(path) => CommandSpec::new(path),
        None => config.agent_command()?,
    };

    let rt = tokio::runtime::Runtime::new()?;
    let (tx, mut rx) = unbounded_channel();
    let runner = SessionRunner::new(command, rt.handle().clone(), tx);
    let session = runner.run(prompt.trim())?;
    // The session task holds its own sender; the channel closes when it ends.
    drop(runner);

    let status = rt.block_on(async {
        let mut status = SessionStatus::Failed;
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::Started { pid, .. } => {
                    debug!(session = %session, pid = ?pid, "agent started");
                }
                SessionEvent::Line { text, .. } => println!("{}", text),
                SessionEvent::AgentError { stderr, .. } => {
                    eprintln!("[Agent Error] {}", stderr.trim_end());
                }
                SessionEvent::AgentException { error, .. } => {
                    eprintln!("[Agent Exception] {}", error);
                }
                SessionEvent::Finished { status: done, .. } => status = done,
            }
        }
        status
    });

    match status {
        SessionStatus::Succeeded => Ok(()),
        _ => Err(format!("agent session {} failed", session).into()),
    }
}

/// Run the automation server in the foreground until Ctrl+C or until it exits.
fn serve(config: &DeskConfig) -> Result<()> {
    let log_file = server_log_file();
    let mut supervisor = ServiceSupervisor::new(config.service_command()).with_log_file(&log_file);

    let status = supervisor.start();
    println!("{}", status);
    if status.is_failure() {
        return Err(status.to_string().into());
    }
    println!("Server output: {}", log_file.display());
    println!("Press Ctrl+C to stop.");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut tick = tokio::time::interval(Duration::from_millis(500));

        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                _ = tick.tick() => {
                    if !supervisor.is_running() {
                        println!("MCP Server exited.");
                        break;
                    }
                }
            }
        }
    });

    println!("{}", supervisor.stop());
    Ok(())
}

/// Print the resolved configuration.
fn show_config(config: &DeskConfig) -> Result<()> {
    let npx = match config.resolved_npx() {
        Some(path) => path.display().to_string(),
        None => format!("{} (not found in PATH)", config.npx_path.display()),
    };

    println!("Automation server");
    println!("  launcher:        {}", npx);
    println!("  command:         {}", config.service_command());
    println!("  output dir:      {}", config.screenshot_dir.display());
    println!("  log file:        {}", server_log_file().display());
    println!();
    println!("Agent");
    println!("  command:         {}", config.agent_command()?);
    println!("  endpoint:        {}", config.agent.endpoint);
    println!("  model:           {}", config.agent.model);
    println!(
        "  api key:         {}",
        if config.agent.api_key.is_some() { "set" } else { "not set" }
    );
    println!();
    println!("State dir:         {}", desk_core::state_dir().display());
    Ok(())
}

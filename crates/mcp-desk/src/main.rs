//! mcp-desk entry point.

use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use desk_core::DeskConfig;
use mcp_desk::cli::{Cli, Commands};
use mcp_desk::{agent_cli, commands, console_log_file, tui};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = desk_core::load_env(cli.env_file.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    init_tracing(&cli);

    let config = DeskConfig::from_env();

    let result = match cli.command {
        None | Some(Commands::Tui) => tui::run(&config),
        Some(Commands::Agent) => agent_cli::execute(&config),
        Some(cmd) => commands::execute(cmd, &config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to a file while the console owns the terminal, else to stderr.
///
/// stdout is reserved: the agent child's stdout is what the console reads.
fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    if !cli.is_interactive() {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    let path = console_log_file();
    let file = path
        .parent()
        .map(std::fs::create_dir_all)
        .transpose()
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&path));

    match file {
        Ok(file) => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Err(_) => fmt().with_env_filter(filter).with_writer(std::io::sink).init(),
    }
}

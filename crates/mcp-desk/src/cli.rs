//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build version string with git hash and build date.
fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const BUILD_DATE: &str = env!("BUILD_DATE");

    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} ({}, {})", VERSION, GIT_HASH, BUILD_DATE))
}

/// mcp-desk - drive browser automation through a hosted agent
#[derive(Parser, Debug)]
#[command(name = "mcp-desk")]
#[command(author, version = version_string(), about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, env = "MCP_DESK_ENV_FILE", global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive console (default)
    Tui,

    /// Run one prompt without the console and print the agent output
    Run {
        /// Prompt for the agent
        #[arg(required = true)]
        prompt: String,

        /// Agent executable to launch instead of the configured one
        #[arg(short, long)]
        agent: Option<PathBuf>,
    },

    /// Run the automation server in the foreground until Ctrl+C
    StartServer,

    /// Act as the agent child: read a prompt on stdin, stream progress to stdout
    Agent,

    /// Print the resolved configuration
    Config,
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// True when the console will own the terminal.
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, None | Some(Commands::Tui))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["mcp-desk"]);
        assert!(cli.command.is_none());
        assert!(cli.is_interactive());
    }

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["mcp-desk", "run", "open example.com"]);
        match cli.command {
            Some(Commands::Run { prompt, agent }) => {
                assert_eq!(prompt, "open example.com");
                assert!(agent.is_none());
            }
            _ => panic!("Expected Run command"),
        }
        assert!(!Cli::parse_from(["mcp-desk", "run", "x"]).is_interactive());
    }

    #[test]
    fn test_cli_parse_run_with_agent() {
        let cli = Cli::parse_from(["mcp-desk", "run", "-a", "/opt/agent", "hi"]);
        match cli.command {
            Some(Commands::Run { agent, .. }) => {
                assert_eq!(agent, Some(PathBuf::from("/opt/agent")));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_agent() {
        let cli = Cli::parse_from(["mcp-desk", "agent"]);
        assert!(matches!(cli.command, Some(Commands::Agent)));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["mcp-desk", "config", "-vv", "--env-file", "desk.env"]);
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
        assert_eq!(cli.env_file, Some(PathBuf::from("desk.env")));
    }

    #[test]
    fn test_cli_verbose() {
        let cli = Cli::parse_from(["mcp-desk", "-vvv"]);
        assert_eq!(cli.verbose, 3);
        assert_eq!(cli.log_level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_cli_help() {
        Cli::command().debug_assert();
    }
}

//! Configuration for mcp-desk.
//!
//! Everything is sourced from environment variables, optionally seeded from a
//! `.env` file in the working directory.
//!
//! # Environment Variables
//!
//! - `NPX_PATH`: launcher for the automation server (default `npx`)
//! - `MCP_PACKAGE`: automation server package (default `@playwright/mcp@latest`)
//! - `DESKTOP_CLIENT_SCREENSHOT_DIR`: server output directory (default `screenshots`)
//! - `AGENT_PATH`: external agent executable or script; unset means the built-in agent
//! - `AGENT_INTERPRETER`: program used to run `AGENT_PATH` (e.g. `python`)
//! - `AGENT_ENDPOINT`, `AGENT_API_KEY`, `AGENT_MODEL`: hosted agent for the built-in agent
//! - `AGENT_MAX_STEPS`: tool-call rounds the built-in agent may take (default 25)
//! - `MCP_DESK_STATE_DIR`: override the state directory (default `~/.mcp-desk`)

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::command::CommandSpec;
use crate::error::{ConfigError, Result};
use crate::hosted_agent::AgentSettings;

pub const NPX_PATH_ENV: &str = "NPX_PATH";
pub const MCP_PACKAGE_ENV: &str = "MCP_PACKAGE";
pub const SCREENSHOT_DIR_ENV: &str = "DESKTOP_CLIENT_SCREENSHOT_DIR";
pub const AGENT_PATH_ENV: &str = "AGENT_PATH";
pub const AGENT_INTERPRETER_ENV: &str = "AGENT_INTERPRETER";
pub const AGENT_ENDPOINT_ENV: &str = "AGENT_ENDPOINT";
pub const AGENT_API_KEY_ENV: &str = "AGENT_API_KEY";
pub const AGENT_MODEL_ENV: &str = "AGENT_MODEL";
pub const AGENT_MAX_STEPS_ENV: &str = "AGENT_MAX_STEPS";
pub const STATE_DIR_ENV: &str = "MCP_DESK_STATE_DIR";

const DEFAULT_NPX: &str = "npx";
const DEFAULT_MCP_PACKAGE: &str = "@playwright/mcp@latest";
const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";
const DEFAULT_STATE_DIR: &str = ".mcp-desk";

/// Subcommand that turns our own binary into the agent child.
pub const AGENT_SUBCOMMAND: &str = "agent";

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// Launcher for the automation server.
    pub npx_path: PathBuf,
    /// Package passed to the launcher.
    pub mcp_package: String,
    /// Output directory handed to the automation server.
    pub screenshot_dir: PathBuf,
    /// External agent executable or script.
    pub agent_path: Option<PathBuf>,
    /// Interpreter for `agent_path`.
    pub agent_interpreter: Option<PathBuf>,
    /// Hosted agent settings used by the built-in agent.
    pub agent: AgentSettings,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            npx_path: PathBuf::from(DEFAULT_NPX),
            mcp_package: DEFAULT_MCP_PACKAGE.to_string(),
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
            agent_path: None,
            agent_interpreter: None,
            agent: AgentSettings::default(),
        }
    }
}

impl DeskConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary lookup function.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mut agent = AgentSettings::default();
        if let Some(endpoint) = get(AGENT_ENDPOINT_ENV) {
            agent.endpoint = endpoint;
        }
        if let Some(model) = get(AGENT_MODEL_ENV) {
            agent.model = model;
        }
        agent.api_key = get(AGENT_API_KEY_ENV);
        if let Some(raw) = get(AGENT_MAX_STEPS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(steps) if steps > 0 => agent.max_steps = steps,
                _ => warn!(value = %raw, "ignoring invalid {}", AGENT_MAX_STEPS_ENV),
            }
        }

        Self {
            npx_path: get(NPX_PATH_ENV).map(PathBuf::from).unwrap_or(defaults.npx_path),
            mcp_package: get(MCP_PACKAGE_ENV).unwrap_or(defaults.mcp_package),
            screenshot_dir: get(SCREENSHOT_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.screenshot_dir),
            agent_path: get(AGENT_PATH_ENV).map(PathBuf::from),
            agent_interpreter: get(AGENT_INTERPRETER_ENV).map(PathBuf::from),
            agent,
        }
    }

    /// Sets the automation server launcher.
    pub fn with_npx_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.npx_path = path.into();
        self
    }

    /// Sets the screenshot/output directory.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// Sets an external agent executable.
    pub fn with_agent_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.agent_path = Some(path.into());
        self
    }

    /// Sets the interpreter used for the external agent.
    pub fn with_agent_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.agent_interpreter = Some(interpreter.into());
        self
    }

    /// Command line for the automation server.
    pub fn service_command(&self) -> CommandSpec {
        CommandSpec::new(&self.npx_path)
            .arg(&self.mcp_package)
            .arg("--output-dir")
            .arg(self.screenshot_dir.as_os_str())
    }

    /// Command line for the tool server the built-in agent drives over stdio.
    ///
    /// Same package and output directory as the supervised server, with
    /// `-y` so `npx` never waits on an install prompt.
    pub fn tool_server_command(&self) -> CommandSpec {
        CommandSpec::new(&self.npx_path)
            .arg("-y")
            .arg(&self.mcp_package)
            .arg("--output-dir")
            .arg(self.screenshot_dir.as_os_str())
    }

    /// Command line for one agent child.
    ///
    /// Without `AGENT_PATH` this is our own executable running the built-in
    /// agent subcommand.
    pub fn agent_command(&self) -> Result<CommandSpec> {
        match (&self.agent_path, &self.agent_interpreter) {
            (Some(path), Some(interpreter)) => {
                Ok(CommandSpec::new(interpreter).arg(path.as_os_str()))
            }
            (Some(path), None) => Ok(CommandSpec::new(path)),
            (None, _) => {
                let exe = std::env::current_exe().map_err(ConfigError::CurrentExe)?;
                Ok(CommandSpec::new(exe).arg(AGENT_SUBCOMMAND))
            }
        }
    }

    /// Absolute location of the automation server launcher, if it can be found.
    pub fn resolved_npx(&self) -> Option<PathBuf> {
        which::which(&self.npx_path).ok()
    }
}

/// Load environment files.
///
/// With an explicit path, failure to read it is an error. Otherwise `.env`
/// and `.env.local` in the working directory are loaded when present.
/// Returns the explicit path that was loaded, if any.
pub fn load_env(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(Some(path.to_path_buf()));
    }

    for name in [".env", ".env.local"] {
        let path = Path::new(name);
        if let Err(e) = load_optional(path) {
            warn!(path = %path.display(), error = %e, "skipping env file");
        }
    }
    Ok(None)
}

/// Load `path` if it exists. Returns whether anything was loaded.
fn load_optional(path: &Path) -> std::result::Result<bool, dotenvy::Error> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded env file");
            Ok(true)
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Get the mcp-desk state directory.
///
/// `MCP_DESK_STATE_DIR` if set, else `~/.mcp-desk`, else `.mcp-desk`.
pub fn state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_STATE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
        })
}

/// Get the logs directory.
pub fn logs_dir() -> PathBuf {
    state_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = DeskConfig::from_lookup(|_| None);
        assert_eq!(config.npx_path, PathBuf::from("npx"));
        assert_eq!(config.mcp_package, "@playwright/mcp@latest");
        assert_eq!(config.screenshot_dir, PathBuf::from("screenshots"));
        assert!(config.agent_path.is_none());
        assert!(config.agent.api_key.is_none());
    }

    #[test]
    fn test_reads_values() {
        let config = DeskConfig::from_lookup(lookup_from(&[
            (NPX_PATH_ENV, "/usr/local/bin/npx"),
            (SCREENSHOT_DIR_ENV, "/tmp/shots"),
            (AGENT_PATH_ENV, "agent.py"),
            (AGENT_INTERPRETER_ENV, "python3"),
            (AGENT_MODEL_ENV, "gpt-4.1-mini"),
        ]));

        assert_eq!(config.npx_path, PathBuf::from("/usr/local/bin/npx"));
        assert_eq!(config.screenshot_dir, PathBuf::from("/tmp/shots"));
        assert_eq!(config.agent_path, Some(PathBuf::from("agent.py")));
        assert_eq!(config.agent.model, "gpt-4.1-mini");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = DeskConfig::from_lookup(lookup_from(&[(NPX_PATH_ENV, "  "), (AGENT_PATH_ENV, "")]));
        assert_eq!(config.npx_path, PathBuf::from("npx"));
        assert!(config.agent_path.is_none());
    }

    #[test]
    fn test_service_command() {
        let config = DeskConfig::default()
            .with_npx_path("/opt/npx")
            .with_screenshot_dir("/data/shots");
        let spec = config.service_command();

        assert_eq!(spec.program, PathBuf::from("/opt/npx"));
        assert_eq!(
            spec.to_string(),
            "/opt/npx @playwright/mcp@latest --output-dir /data/shots"
        );
    }

    #[test]
    fn test_agent_command_external_script() {
        let config = DeskConfig::default()
            .with_agent_path("agent.py")
            .with_agent_interpreter("python3");
        let spec = config.agent_command().unwrap();

        assert_eq!(spec.program, PathBuf::from("python3"));
        assert_eq!(spec.args, vec![std::ffi::OsString::from("agent.py")]);
    }

    #[test]
    fn test_agent_command_external_executable() {
        let config = DeskConfig::default().with_agent_path("/usr/bin/my-agent");
        let spec = config.agent_command().unwrap();

        assert_eq!(spec.program, PathBuf::from("/usr/bin/my-agent"));
        assert!(spec.args.is_empty());
    }

    #[test]
    fn test_agent_command_builtin() {
        let spec = DeskConfig::default().agent_command().unwrap();
        assert_eq!(spec.program, std::env::current_exe().unwrap());
        assert_eq!(spec.args, vec![std::ffi::OsString::from(AGENT_SUBCOMMAND)]);
    }

    #[test]
    fn test_load_env_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("desk.env");
        std::fs::write(&path, "MCP_DESK_TEST_ONLY_VAR=loaded\n").unwrap();

        let loaded = load_env(Some(&path)).unwrap();
        assert_eq!(loaded, Some(path));
        assert_eq!(std::env::var("MCP_DESK_TEST_ONLY_VAR").unwrap(), "loaded");
    }

    #[test]
    fn test_load_env_missing_explicit_file() {
        let result = load_env(Some(Path::new("/nonexistent/desk.env")));
        assert!(matches!(result, Err(ConfigError::EnvFile { .. })));
    }

    #[test]
    fn test_optional_env_file_outcomes() {
        let dir = tempfile::tempdir().unwrap();

        assert!(!load_optional(&dir.path().join(".env")).unwrap());

        let good = dir.path().join("good.env");
        std::fs::write(&good, "MCP_DESK_TEST_OPTIONAL_VAR=yes\n").unwrap();
        assert!(load_optional(&good).unwrap());
        assert_eq!(std::env::var("MCP_DESK_TEST_OPTIONAL_VAR").unwrap(), "yes");

        let bad = dir.path().join("bad.env");
        std::fs::write(&bad, "this line has no assignment\n").unwrap();
        assert!(matches!(load_optional(&bad), Err(dotenvy::Error::LineParse(..))));
    }

    #[test]
    fn test_tool_server_command() {
        let config = DeskConfig::default().with_screenshot_dir("shots");
        assert_eq!(
            config.tool_server_command().to_string(),
            "npx -y @playwright/mcp@latest --output-dir shots"
        );
    }

    #[test]
    fn test_max_steps() {
        assert_eq!(DeskConfig::from_lookup(|_| None).agent.max_steps, 25);
        let config = DeskConfig::from_lookup(lookup_from(&[(AGENT_MAX_STEPS_ENV, "5")]));
        assert_eq!(config.agent.max_steps, 5);
        let config = DeskConfig::from_lookup(lookup_from(&[(AGENT_MAX_STEPS_ENV, "zero")]));
        assert_eq!(config.agent.max_steps, 25);
    }

    #[test]
    fn test_logs_dir_under_state_dir() {
        assert!(logs_dir().starts_with(state_dir()));
        assert!(logs_dir().ends_with("logs"));
    }
}

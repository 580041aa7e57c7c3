//! Configuration file management for devscout.
//!
//! Provides a TOML-based config file at `~/.config/devscout/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use devscout_core::Workflow;
use devscout_core::workflow::CommandWorkflow;

/// Overrides `[workflow] program`.
pub const WORKFLOW_ENV: &str = "DEVSCOUT_WORKFLOW";
/// Overrides `[server] port`.
pub const PORT_ENV: &str = "DEVSCOUT_PORT";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub workflow: WorkflowSection,
    pub server: ServerSection,
    pub gui: GuiSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSection {
    /// Research program to run; the query is appended as its last argument.
    pub program: String,
    /// Arguments placed before the query.
    pub args: Vec<String>,
}

impl WorkflowSection {
    pub const DEFAULT_PROGRAM: &str = "devscout-workflow";

    /// Build a fresh workflow instance from this section.
    pub fn build(&self) -> Arc<dyn Workflow> {
        Arc::new(CommandWorkflow::new(&self.program).with_args(self.args.iter().cloned()))
    }
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            program: Self::DEFAULT_PROGRAM.to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
    /// Browser origins allowed to call the API.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiSection {
    /// Start the window in the dark theme.
    pub dark_mode: bool,
}

impl Default for GuiSection {
    fn default() -> Self {
        Self { dark_mode: true }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the devscout config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/devscout` or
/// `~/.config/devscout`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("devscout");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("devscout")
}

/// Return the path to the devscout config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load the config file at `path`. A missing file yields the defaults; an
/// unreadable or malformed one is an error.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Load the config file from its standard location.
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

/// Serialize and write `config` to `path`, creating parent dirs as needed.
pub fn save_config_to(config: &ConfigFile, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevscoutConfig {
    pub workflow: WorkflowSection,
    pub server: ServerSection,
    pub gui: GuiSection,
}

impl DevscoutConfig {
    /// Resolve configuration from the standard config file location.
    pub fn resolve(cli_workflow: Option<&str>) -> Result<Self> {
        Self::resolve_with(load_config()?, cli_workflow)
    }

    /// Apply the chain: CLI flag > env var > config file > default.
    ///
    /// - Workflow program: `cli_workflow` > `DEVSCOUT_WORKFLOW` > `[workflow] program`
    /// - Server port: `DEVSCOUT_PORT` > `[server] port`
    ///
    /// Serve-time `--bind`/`--port` flags are applied by the caller.
    pub fn resolve_with(file: ConfigFile, cli_workflow: Option<&str>) -> Result<Self> {
        let ConfigFile {
            mut workflow,
            mut server,
            gui,
        } = file;

        if let Some(program) = cli_workflow {
            workflow.program = program.to_string();
        } else if let Ok(program) = std::env::var(WORKFLOW_ENV) {
            workflow.program = program;
        }

        if let Ok(port) = std::env::var(PORT_ENV) {
            server.port = port
                .parse()
                .with_context(|| format!("{PORT_ENV} is not a valid port: {port:?}"))?;
        }

        Ok(Self {
            workflow,
            server,
            gui,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

//! Configuration for ios-control.
//!
//! Every external tool the facade shells out to is described by a
//! [`ToolCommand`]: a program plus fixed leading arguments. The defaults target
//! libimobiledevice, pymobiledevice3 and tidevice, but any of them can be
//! pointed elsewhere from `~/.ios-control/config.json`.
//!
//! # Example
//!
//! ```no_run
//! use ios_control_core::config::ControlConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = ControlConfig::load();
//! println!("discovery via {}", config.tools.device_list.program);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runner::Invocation;

const CONFIG_DIRNAME: &str = ".ios-control";
const CONFIG_FILENAME: &str = "config.json";

/// Errors from loading an explicitly requested configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// An external program plus the arguments that precede every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds an invocation with `extra` appended after the fixed arguments.
    pub fn invocation<I, S>(&self, extra: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = self.args.clone();
        args.extend(extra.into_iter().map(Into::into));
        Invocation {
            program: self.program.clone(),
            args,
        }
    }
}

/// The external tools, one per concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Lists attached device UDIDs, one per line.
    pub device_list: ToolCommand,
    /// Prints one value (`-k KEY`) or a `key: value` dump.
    pub device_info: ToolCommand,
    /// Installs, uninstalls and lists apps.
    pub installer: ToolCommand,
    /// Supports the `restart` sub-operation.
    pub diagnostics: ToolCommand,
    /// Writes a screenshot to a destination path.
    pub screenshot: ToolCommand,
    /// Primary UI automation backend (operation name first, then `--udid`).
    pub automation: ToolCommand,
    /// Secondary UI automation backend (`--udid` first, then operation name).
    pub fallback_automation: ToolCommand,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            device_list: ToolCommand::new("idevice_id", ["-l"]),
            device_info: ToolCommand::new("ideviceinfo", Vec::<String>::new()),
            installer: ToolCommand::new("ideviceinstaller", Vec::<String>::new()),
            diagnostics: ToolCommand::new("idevicediagnostics", Vec::<String>::new()),
            screenshot: ToolCommand::new("idevicescreenshot", Vec::<String>::new()),
            automation: ToolCommand::new(
                "python3",
                ["-m", "pymobiledevice3", "developer", "dvt"],
            ),
            fallback_automation: ToolCommand::new("tidevice", Vec::<String>::new()),
        }
    }
}

/// Persistent ios-control configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub tools: ToolsConfig,
    /// Delay between hierarchy polls while waiting for an element.
    pub poll_interval_ms: u64,
    /// Default timeout for waiting on an element.
    pub wait_timeout_secs: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tools: ToolsConfig::default(),
            poll_interval_ms: 500,
            wait_timeout_secs: 10,
        }
    }
}

/// Returns `~/.ios-control/config.json`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIRNAME).join(CONFIG_FILENAME))
}

impl ControlConfig {
    /// Load config from `~/.ios-control/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        default_config_path()
            .map(|path| Self::load_or_default(&path))
            .unwrap_or_default()
    }

    fn load_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_default()
    }

    /// Load config from an explicit path. Unlike [`Self::load`], a missing or
    /// malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

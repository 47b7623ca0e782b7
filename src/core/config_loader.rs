//! # Config Loader
//!
//! Loads the taskdeck configuration from TOML. The file is optional: when it does not
//! exist every section falls back to its defaults, while a file that exists but does
//! not parse is reported as an error rather than silently ignored.

use crate::{
    constants::{
        DEFAULT_EVENT_CAPACITY, DEFAULT_OUTPUT_DRAIN_MS, DEFAULT_TERMINATION_GRACE_MS,
        DEFAULT_TOOL_BINARY, DEFAULT_TOOL_TIMEOUT_MS,
    },
    core::paths::{self, PathError},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Errors raised while loading or rendering the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config location could not be resolved.
    #[error(transparent)]
    Path(#[from] PathError),
    /// The file exists but could not be read.
    #[error("Could not read config file '{path}': {source}")]
    Read {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        /// File that failed.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The in-memory configuration could not be rendered.
    #[error("Failed to serialize config to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Tuning knobs of the process execution engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Applied to calls that do not set their own timeout.
    pub default_timeout_ms: Option<u64>,
    /// How long a terminated child gets to report its exit status.
    pub termination_grace_ms: u64,
    /// How long output pipes are drained after the child exits.
    pub output_drain_ms: u64,
    /// Buffered progress events per subscriber before it starts lagging.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: None,
            termination_grace_ms: DEFAULT_TERMINATION_GRACE_MS,
            output_drain_ms: DEFAULT_OUTPUT_DRAIN_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// `default_timeout_ms` as a `Duration`.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    /// `termination_grace_ms` as a `Duration`.
    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }

    /// `output_drain_ms` as a `Duration`.
    pub fn output_drain(&self) -> Duration {
        Duration::from_millis(self.output_drain_ms)
    }
}

/// How the task-tracking tool is invoked.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ToolConfig {
    /// Executable name or path.
    pub binary: String,
    /// Default repository to run in. `~` and `$VAR` are expanded.
    pub repo: Option<String>,
    /// Ask the tool for machine-readable output.
    pub json: bool,
    /// Extra environment for every tool invocation.
    pub env: HashMap<String, String>,
    /// Timeout for each tool invocation. `None` leaves it unbounded.
    pub timeout_ms: Option<u64>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_TOOL_BINARY.to_string(),
            repo: None,
            json: true,
            env: HashMap::new(),
            timeout_ms: Some(DEFAULT_TOOL_TIMEOUT_MS),
        }
    }
}

impl ToolConfig {
    /// The configured repository with `~` and variables expanded.
    pub fn repo_path(&self) -> Result<Option<PathBuf>, PathError> {
        self.repo.as_deref().map(paths::expand_path).transpose()
    }
}

/// The complete configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TaskdeckConfig {
    /// `[engine]`
    pub engine: EngineConfig,
    /// `[tool]`
    pub tool: ToolConfig,
}

impl TaskdeckConfig {
    /// Loads the configuration from its default location.
    pub fn load() -> Result<Self, ConfigError> {
        let path = paths::get_config_path()?;
        Self::load_from(&path)
    }

    /// Loads the configuration from `path`, returning defaults when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No config file at '{}', using defaults.", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        log::debug!("Loading config from '{}'", path.display());
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

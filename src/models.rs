// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

// --- PROCESS IDENTITY ---

/// Opaque identifier for one in-flight child process.
///
/// Handles are allocated by the engine at launch time and are only meaningful
/// while the process is tracked in the engine's active registry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle(Uuid);

impl ProcessHandle {
    /// Allocates a fresh, never-before-seen handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProcessHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell concurrent processes apart in logs.
        let simple = self.0.simple().to_string();
        f.write_str(simple.get(..8).unwrap_or(simple.as_str()))
    }
}

// --- INVOCATION MODELS ---

/// Per-call configuration. Every field is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Working directory. Defaults to the current directory of the host process.
    pub cwd: Option<PathBuf>,
    /// Variables merged over (never replacing) the ambient environment.
    pub env: HashMap<String, String>,
    /// Upper bound on wall-clock runtime. `None` means unbounded.
    pub timeout_ms: Option<u64>,
    /// Interpret the command line through the platform shell.
    pub shell: bool,
}

impl ExecutionOptions {
    /// Sets the working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Adds one environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Enables or disables shell mode.
    pub fn with_shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    /// The configured timeout as a `Duration`.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// A single entry of a sequence or parallel batch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable, or the full command line in shell mode.
    pub command: String,
    /// Arguments passed verbatim.
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-entry options, written inline next to `command` in TOML.
    #[serde(flatten)]
    pub options: ExecutionOptions,
}

impl CommandSpec {
    /// Creates an entry with default options.
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            options: ExecutionOptions::default(),
        }
    }

    /// Replaces the options of this entry.
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// Human-readable rendering of the invocation, used in events and messages.
    pub fn descriptor(&self) -> String {
        describe_command(&self.command, &self.args)
    }
}

/// Renders `command args...` with shell-style quoting where needed.
pub fn describe_command(command: &str, args: &[String]) -> String {
    let parts = std::iter::once(command).chain(args.iter().map(String::as_str));
    shlex::try_join(parts).unwrap_or_else(|_| {
        // Arguments containing NUL bytes cannot be quoted; fall back to a plain join.
        std::iter::once(command.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    })
}

// --- RESULT MODELS ---

/// Outcome of one invocation. Produced exactly once per call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// `true` iff the exit code is 0 and no signal terminated the process.
    pub success: bool,
    /// Absent when the process was terminated by a signal or never launched.
    pub exit_code: Option<i32>,
    /// Name of the terminating signal, e.g. `SIGTERM`.
    pub signal: Option<String>,
    /// Captured standard output, minus one trailing newline.
    pub stdout: String,
    /// Captured standard error, minus one trailing newline.
    pub stderr: String,
    /// Wall-clock time from launch to termination. Always at least 1.
    pub duration_ms: u64,
}

impl CommandResult {
    /// Result for a process that could not be launched.
    pub fn not_launched(elapsed: Duration) -> Self {
        Self {
            success: false,
            exit_code: None,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: duration_to_ms(elapsed),
        }
    }
}

/// Converts an elapsed duration to whole milliseconds, never returning 0.
pub fn duration_to_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

/// Removes exactly one trailing newline (`\n` or `\r\n`).
pub fn trim_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

// --- LIFECYCLE EVENTS ---

/// Lifecycle stage of a tracked process.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    /// The handle was allocated and a launch is about to be attempted.
    Starting,
    /// The OS reported a successful launch.
    Running,
    /// The process exited with status 0.
    Completed,
    /// Any other outcome, including a failed launch.
    Failed,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Notification emitted on the engine's event stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// The process this event belongs to.
    pub handle: ProcessHandle,
    /// The stage just entered.
    pub stage: ProgressStage,
    /// Rendered command line.
    pub command: String,
}

/// Snapshot of one tracked process, for dashboards and diagnostics.
#[derive(Serialize, Debug, Clone)]
pub struct ActiveProcess {
    /// Engine handle of the process.
    pub handle: ProcessHandle,
    /// Rendered command line.
    pub command: String,
    /// OS process id, once the process has been launched.
    pub pid: Option<u32>,
    /// When the handle was registered.
    pub started_at: SystemTime,
}

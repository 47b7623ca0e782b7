// src/constants.rs

/// Name of the application directory inside the system config directory.
pub const CONFIG_DIR_NAME: &str = "taskdeck";

/// Name of the configuration file (inside the config directory).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "TASKDECK_CONFIG";

/// Default executable of the task-tracking tool.
pub const DEFAULT_TOOL_BINARY: &str = "bd";

/// Default timeout for a single task-tracking tool invocation.
pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 30_000;

/// How long to wait for a signalled child to report its exit status.
pub const DEFAULT_TERMINATION_GRACE_MS: u64 = 2_000;

/// How long to keep draining output pipes after the child has exited.
/// Grandchildren may inherit the pipes and keep them open indefinitely.
pub const DEFAULT_OUTPUT_DRAIN_MS: u64 = 500;

/// Capacity of the progress event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Size of each read from a child's output pipe.
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Exit code used by the binary when interrupted with Ctrl+C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

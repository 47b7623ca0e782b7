//! Process execution engine and command-line front end for driving a task-tracking
//! tool against local Git repositories.

/// Command-line front end.
pub mod cli;
/// Names and default values.
pub mod constants;
/// Configuration, paths and tool command rendering.
pub mod core;
/// Data types shared by the engine and its callers.
pub mod models;
pub mod system;

pub use crate::core::config_loader::{EngineConfig, TaskdeckConfig};
pub use crate::models::{
    ActiveProcess, CommandResult, CommandSpec, ExecutionOptions, ProcessHandle, ProgressEvent,
    ProgressStage,
};
pub use crate::system::executor::{ExecutionError, ExecutionErrorKind, ProcessEngine};

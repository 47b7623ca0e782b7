// src/core/command_builder.rs

//! Renders task-tracking tool operations into executable [`CommandSpec`]s.
//!
//! The builder never runs anything; it only decides the argument vector, working
//! directory, environment and timeout so the engine can launch the tool directly
//! (no shell, no quoting concerns).

use crate::{
    core::{config_loader::ToolConfig, paths::PathError},
    models::{CommandSpec, ExecutionOptions},
};
use std::path::PathBuf;
use thiserror::Error;

/// Highest priority value the tool accepts (0 is the most urgent).
pub const MAX_PRIORITY: u8 = 4;

/// Reasons a tool action cannot be rendered.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A required argument was blank.
    #[error("The {0} must not be empty.")]
    EmptyArgument(&'static str),
    /// Priority above [`MAX_PRIORITY`].
    #[error("Priority {0} is out of range (0-4).")]
    InvalidPriority(u8),
    /// An update that would change nothing.
    #[error("Nothing to update: specify at least one field to change.")]
    NothingToUpdate,
    /// The configured repository path could not be expanded.
    #[error(transparent)]
    Path(#[from] PathError),
}

/// One operation of the task-tracking tool.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)] // Variant fields mirror the tool's own flags.
pub enum ToolAction {
    /// `list`, optionally filtered by status and capped in length.
    List {
        status: Option<String>,
        limit: Option<u32>,
    },
    /// `show <id>`.
    Show { id: String },
    /// `ready`: issues with no open blockers.
    Ready,
    /// `create <title>`.
    Create {
        title: String,
        priority: Option<u8>,
        issue_type: Option<String>,
        description: Option<String>,
    },
    /// `update <id>` with at least one field set.
    Update {
        id: String,
        status: Option<String>,
        priority: Option<u8>,
        assignee: Option<String>,
    },
    /// `close <id>`.
    Close { id: String, reason: Option<String> },
    /// `stats`.
    Stats,
}

/// Builds tool invocations from the `[tool]` configuration section.
#[derive(Debug, Clone)]
pub struct ToolCommandBuilder {
    config: ToolConfig,
    repo: Option<PathBuf>,
}

impl ToolCommandBuilder {
    /// Creates a builder, expanding the configured default repository.
    pub fn new(config: ToolConfig) -> Result<Self, BuildError> {
        let repo = config.repo_path()?;
        Ok(Self { config, repo })
    }

    /// Overrides the repository the tool runs in.
    pub fn in_repo(mut self, repo: impl Into<PathBuf>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    /// Renders one action.
    pub fn build(&self, action: &ToolAction) -> Result<CommandSpec, BuildError> {
        let mut args: Vec<String> = Vec::new();
        match action {
            ToolAction::List { status, limit } => {
                args.push("list".into());
                push_flag(&mut args, "--status", status.as_deref());
                push_flag(&mut args, "--limit", limit.map(|l| l.to_string()).as_deref());
            }
            ToolAction::Show { id } => {
                args.push("show".into());
                args.push(require("issue id", id)?);
            }
            ToolAction::Ready => args.push("ready".into()),
            ToolAction::Create {
                title,
                priority,
                issue_type,
                description,
            } => {
                args.push("create".into());
                args.push(require("issue title", title)?);
                push_flag(&mut args, "--priority", check_priority(*priority)?.as_deref());
                push_flag(&mut args, "--type", issue_type.as_deref());
                push_flag(&mut args, "--description", description.as_deref());
            }
            ToolAction::Update {
                id,
                status,
                priority,
                assignee,
            } => {
                if status.is_none() && priority.is_none() && assignee.is_none() {
                    return Err(BuildError::NothingToUpdate);
                }
                args.push("update".into());
                args.push(require("issue id", id)?);
                push_flag(&mut args, "--status", status.as_deref());
                push_flag(&mut args, "--priority", check_priority(*priority)?.as_deref());
                push_flag(&mut args, "--assignee", assignee.as_deref());
            }
            ToolAction::Close { id, reason } => {
                args.push("close".into());
                args.push(require("issue id", id)?);
                push_flag(&mut args, "--reason", reason.as_deref());
            }
            ToolAction::Stats => args.push("stats".into()),
        }

        if self.config.json {
            args.push("--json".into());
        }

        let options = ExecutionOptions {
            cwd: self.repo.clone(),
            env: self.config.env.clone(),
            timeout_ms: self.config.timeout_ms,
            shell: false,
        };
        Ok(CommandSpec::new(self.config.binary.clone(), args).with_options(options))
    }
}

fn require(what: &'static str, value: &str) -> Result<String, BuildError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BuildError::EmptyArgument(what));
    }
    Ok(trimmed.to_string())
}

fn check_priority(priority: Option<u8>) -> Result<Option<String>, BuildError> {
    match priority {
        Some(p) if p > MAX_PRIORITY => Err(BuildError::InvalidPriority(p)),
        other => Ok(other.map(|p| p.to_string())),
    }
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ToolCommandBuilder {
        ToolCommandBuilder::new(ToolConfig::default()).unwrap()
    }

    #[test]
    fn test_list_with_filters() {
        let spec = builder()
            .build(&ToolAction::List {
                status: Some("open".into()),
                limit: Some(20),
            })
            .unwrap();
        assert_eq!(spec.command, "bd");
        assert_eq!(spec.args, vec!["list", "--status", "open", "--limit", "20", "--json"]);
        assert_eq!(spec.options.timeout_ms, Some(crate::constants::DEFAULT_TOOL_TIMEOUT_MS));
        assert!(!spec.options.shell);
    }

    #[test]
    fn test_create_keeps_title_as_single_argument() {
        let spec = builder()
            .build(&ToolAction::Create {
                title: "  Fix login; rm -rf /  ".into(),
                priority: Some(1),
                issue_type: Some("bug".into()),
                description: None,
            })
            .unwrap();
        assert_eq!(
            spec.args,
            vec!["create", "Fix login; rm -rf /", "--priority", "1", "--type", "bug", "--json"]
        );
    }

    #[test]
    fn test_empty_id_is_rejected() {
        let result = builder().build(&ToolAction::Show { id: "   ".into() });
        assert!(matches!(result, Err(BuildError::EmptyArgument("issue id"))));
    }

    #[test]
    fn test_priority_out_of_range_is_rejected() {
        let result = builder().build(&ToolAction::Update {
            id: "bd-12".into(),
            status: None,
            priority: Some(9),
            assignee: None,
        });
        assert!(matches!(result, Err(BuildError::InvalidPriority(9))));
    }

    #[test]
    fn test_update_without_fields_is_rejected() {
        let result = builder().build(&ToolAction::Update {
            id: "bd-12".into(),
            status: None,
            priority: None,
            assignee: None,
        });
        assert!(matches!(result, Err(BuildError::NothingToUpdate)));
    }

    #[test]
    fn test_config_drives_binary_repo_env_and_json() {
        let mut config = ToolConfig {
            binary: "/opt/bd".into(),
            json: false,
            timeout_ms: None,
            ..ToolConfig::default()
        };
        config.env.insert("BEADS_NO_DAEMON".into(), "1".into());

        let spec = ToolCommandBuilder::new(config)
            .unwrap()
            .in_repo("/srv/tracker")
            .build(&ToolAction::Close {
                id: "bd-3".into(),
                reason: Some("done".into()),
            })
            .unwrap();

        assert_eq!(spec.command, "/opt/bd");
        assert_eq!(spec.args, vec!["close", "bd-3", "--reason", "done"]);
        assert_eq!(spec.options.cwd, Some(PathBuf::from("/srv/tracker")));
        assert_eq!(spec.options.env.get("BEADS_NO_DAEMON").map(String::as_str), Some("1"));
        assert_eq!(spec.options.timeout_ms, None);
    }
}

// src/cli/args.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run one command and report its result.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // Handlers receive the arguments after the command name.
pub struct ExecArgs {
    /// Working directory for the command. Defaults to the current directory.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Extra environment variable ("KEY=VALUE"), merged over the current environment.
    /// Repeat the flag for several variables; values may contain commas.
    #[arg(long, short)]
    pub env: Vec<String>,

    /// Terminate the command after this many milliseconds.
    #[arg(long, short)]
    pub timeout: Option<u64>,

    /// Interpret the command through the platform shell.
    #[arg(long)]
    pub shell: bool,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,

    /// The executable (or shell command line with --shell).
    pub command: String,

    /// Arguments passed to the command. Use `--` before them if they clash with
    /// the options above.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Run the steps of a sequence file.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct SeqArgs {
    /// A TOML file with one `[[step]]` table per command.
    pub file: PathBuf,

    /// Run all steps concurrently instead of stopping at the first failure.
    #[arg(long)]
    pub parallel: bool,

    /// Print the results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Drive the task-tracking tool.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
pub struct ToolArgs {
    /// Repository to run the tool in. Overrides `tool.repo` from the config.
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    /// Print the tool's output untouched instead of pretty-printing JSON.
    #[arg(long, global = true)]
    pub raw: bool,

    /// The tool operation to run.
    #[command(subcommand)]
    pub action: ToolSubcommand,
}

/// Operations of the task-tracking tool.
#[derive(Subcommand, Debug)]
pub enum ToolSubcommand {
    /// List issues.
    List {
        /// Only issues in this status (e.g. open, `in_progress`, closed).
        #[arg(long, short)]
        status: Option<String>,
        /// At most this many issues.
        #[arg(long, short = 'n')]
        limit: Option<u32>,
    },
    /// Show one issue.
    Show {
        /// Issue id.
        id: String,
    },
    /// List issues that are ready to work on.
    Ready,
    /// Create an issue.
    Create {
        /// Issue title.
        title: String,
        /// Priority from 0 (most urgent) to 4.
        #[arg(long, short)]
        priority: Option<u8>,
        /// Issue type (e.g. bug, feature, task).
        #[arg(long = "type", short)]
        issue_type: Option<String>,
        /// Longer description.
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Update fields of an issue.
    Update {
        /// Issue id.
        id: String,
        /// New status.
        #[arg(long, short)]
        status: Option<String>,
        /// New priority from 0 to 4.
        #[arg(long, short)]
        priority: Option<u8>,
        /// New assignee.
        #[arg(long, short)]
        assignee: Option<String>,
    },
    /// Close an issue.
    Close {
        /// Issue id.
        id: String,
        /// Why the issue is closed.
        #[arg(long, short)]
        reason: Option<String>,
    },
    /// Show tracker statistics.
    Stats,
}

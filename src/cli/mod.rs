use clap::Parser;

/// Argument structs of the individual commands.
pub mod args;
/// Routes the first argument to a command handler.
pub mod dispatcher;
pub mod handlers;

const COMMANDS_HELP: &str = "\
Commands:
  exec [options] <command> [args...]   Run a command and report its result
  seq <file.toml> [--parallel]         Run the [[step]] entries of a sequence file
  tool <action> [args...]              Drive the task-tracking tool (alias: bd)
  config                               Print the effective configuration

Anything that is not a command is run as `exec`, e.g. `taskdeck git status`.
Set RUST_LOG=debug to trace process lifecycles.";

/// taskdeck: run and supervise the task-tracking tool and other external commands.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = COMMANDS_HELP)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The command followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

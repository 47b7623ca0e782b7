// src/system/shell.rs

//! Shell-mode command construction.
//!
//! When an invocation asks for shell mode, the command string is handed to the
//! platform shell verbatim (so pipes, redirections and `&&` work) and every extra
//! argument is quoted before being appended.

use std::ffi::OsString;

/// Program and argument vector that run a command line through the platform shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    /// The shell executable.
    pub program: OsString,
    /// The command flag followed by the full command line.
    pub args: Vec<String>,
}

/// Builds the invocation for `command args...` in shell mode.
pub fn shell_invocation(command: &str, args: &[String]) -> ShellInvocation {
    let command_line = build_command_line(command, args);
    let (program, flag) = default_shell();
    ShellInvocation {
        program: OsString::from(program),
        args: vec![flag.to_string(), command_line],
    }
}

/// Joins the raw command with its quoted arguments.
///
/// The command itself is not quoted: in shell mode it is shell syntax by contract.
pub fn build_command_line(command: &str, args: &[String]) -> String {
    let mut line = command.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&quote_argument(arg));
    }
    line
}

fn quote_argument(arg: &str) -> String {
    if cfg!(target_os = "windows") {
        wrap_value(arg)
    } else {
        shlex::try_quote(arg)
            .map(|quoted| quoted.into_owned())
            .unwrap_or_else(|_| wrap_value(arg))
    }
}

// Wraps a string in double quotes, escaping internal quotes.
fn wrap_value(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// The shell used for shell mode on this platform, with its "run this string" flag.
pub fn default_shell() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("/bin/sh", "-c")
    }
}

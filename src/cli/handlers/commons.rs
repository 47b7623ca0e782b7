// src/cli/handlers/commons.rs

// Shared helpers used by multiple handlers.

use crate::{
    models::CommandResult,
    system::executor::{ExecutionError, ExecutionErrorKind},
};
use anyhow::{Result, anyhow};
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;

/// Parses `KEY=VALUE` pairs. The value may be empty and may itself contain `=`.
pub fn parse_env_pairs(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid environment variable '{}': expected KEY=VALUE.", pair))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(anyhow!("Invalid environment variable '{}': empty name.", pair));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

/// JSON shape printed by `--json`.
#[derive(Serialize, Debug)]
pub struct JsonOutcome<'a> {
    /// Rendered command line.
    pub command: &'a str,
    /// Whether the command succeeded.
    pub ok: bool,
    /// Failure classification, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ExecutionErrorKind>,
    /// Failure message, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    /// The full or partial result.
    pub result: &'a CommandResult,
}

impl<'a> JsonOutcome<'a> {
    /// Borrows the printable parts of an engine outcome.
    pub fn new(command: &'a str, outcome: &'a Result<CommandResult, ExecutionError>) -> Self {
        match outcome {
            Ok(result) => Self {
                command,
                ok: true,
                error_kind: None,
                error: None,
                result,
            },
            Err(e) => Self {
                command,
                ok: false,
                error_kind: Some(e.kind()),
                error: Some(e.message()),
                result: e.result(),
            },
        }
    }
}

/// Prints the command being launched, in the same style for every handler.
pub fn announce(command: &str) {
    println!("{} {}", "→".blue(), command.green());
}

/// Prints captured output and a one-line status for one invocation.
pub fn print_outcome(outcome: &Result<CommandResult, ExecutionError>) {
    let result = match outcome {
        Ok(result) => result,
        Err(e) => e.result(),
    };
    if !result.stdout.is_empty() {
        println!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr.dimmed());
    }

    let status = match (result.exit_code, &result.signal) {
        (Some(code), _) => format!("exit {}", code),
        (None, Some(signal)) => signal.clone(),
        (None, None) => "no exit status".to_string(),
    };
    let timing = format!("in {} ms", result.duration_ms);
    match outcome {
        Ok(_) => println!("{} {} {}", "✔".green(), status.green(), timing.dimmed()),
        Err(e) => println!(
            "{} {} {} {}",
            "✘".red(),
            status.red(),
            timing.dimmed(),
            format!("({})", e.kind()).yellow()
        ),
    }
}

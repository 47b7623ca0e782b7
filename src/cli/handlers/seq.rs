use crate::{
    cli::{
        args::SeqArgs,
        handlers::{AppContext, HandlerFuture, commons},
    },
    models::{CommandResult, CommandSpec},
    system::executor::ExecutionError,
};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use serde::Deserialize;
use std::{fs, path::Path};

/// On-disk format of a sequence file: one `[[step]]` table per command.
#[derive(Deserialize, Debug)]
pub struct SequenceFile {
    /// Steps in file order.
    #[serde(rename = "step", default)]
    pub steps: Vec<CommandSpec>,
}

impl SequenceFile {
    /// Reads and parses a sequence file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read sequence file '{}'", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse sequence file '{}'", path.display()))
    }
}

/// Entry point for the 'seq' command.
pub fn handle(args: Vec<String>, ctx: &AppContext) -> HandlerFuture<'_> {
    Box::pin(run(args, ctx))
}

async fn run(args: Vec<String>, ctx: &AppContext) -> Result<()> {
    let seq_args = SeqArgs::try_parse_from(&args)?;
    let file = SequenceFile::load(&seq_args.file)?;
    if file.steps.is_empty() {
        println!("{}", "Sequence is empty. Nothing to execute.".yellow());
        return Ok(());
    }

    if seq_args.parallel {
        run_parallel(&file.steps, seq_args.json, ctx).await
    } else {
        run_sequential(&file.steps, seq_args.json, ctx).await
    }
}

async fn run_sequential(steps: &[CommandSpec], json: bool, ctx: &AppContext) -> Result<()> {
    if !json {
        for step in steps {
            commons::announce(&step.descriptor());
        }
    }
    let outcome = ctx.engine.execute_sequence(steps).await;
    match &outcome {
        Ok(results) if json => println!("{}", serde_json::to_string_pretty(results)?),
        Ok(results) => {
            for result in results {
                commons::print_outcome(&Ok(result.clone()));
            }
        }
        Err(e) if json => {
            let failed: Result<CommandResult, ExecutionError> = Err(e.clone());
            println!(
                "{}",
                serde_json::to_string_pretty(&commons::JsonOutcome::new(e.command(), &failed))?
            );
        }
        Err(e) => commons::print_outcome(&Err(e.clone())),
    }
    outcome?;
    Ok(())
}

async fn run_parallel(steps: &[CommandSpec], json: bool, ctx: &AppContext) -> Result<()> {
    if !json {
        println!(
            "{}",
            format!("┌─ Running {} commands in parallel...", steps.len()).dimmed()
        );
        for step in steps {
            println!("{} {}", "├─>".dimmed(), step.descriptor().green());
        }
    }

    let outcomes = ctx.engine.execute_parallel(steps).await;
    let descriptors: Vec<String> = steps.iter().map(CommandSpec::descriptor).collect();

    if json {
        let rendered: Vec<_> = descriptors
            .iter()
            .zip(&outcomes)
            .map(|(descriptor, outcome)| commons::JsonOutcome::new(descriptor, outcome))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        for (descriptor, outcome) in descriptors.iter().zip(&outcomes) {
            commons::announce(descriptor);
            commons::print_outcome(outcome);
        }
        println!("{}", "└─ End batch.".dimmed());
    }

    let failures = outcomes.iter().filter(|o| o.is_err()).count();
    if failures > 0 {
        return Err(anyhow!(
            "{} command(s) in the parallel batch failed.",
            failures
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sequence_file_parses_steps_in_order() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[[step]]
command = "bd"
args = ["sync"]
timeout_ms = 10000

[[step]]
command = "git status --short | wc -l"
shell = true
"#,
        )
        .unwrap();
        file.flush().unwrap();

        let sequence = SequenceFile::load(file.path()).unwrap();
        assert_eq!(sequence.steps.len(), 2);
        let first = sequence.steps.first().unwrap();
        assert_eq!(first.command, "bd");
        assert_eq!(first.options.timeout_ms, Some(10_000));
        let second = sequence.steps.get(1).unwrap();
        assert!(second.options.shell);
        assert!(second.args.is_empty());
    }

    #[test]
    fn test_missing_sequence_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SequenceFile::load(&dir.path().join("missing.toml")).is_err());
    }
}

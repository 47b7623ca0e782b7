use crate::{
    cli::{
        args::ExecArgs,
        handlers::{AppContext, HandlerFuture, commons},
    },
    models::{ExecutionOptions, describe_command},
};
use anyhow::Result;
use clap::Parser;

/// Entry point for the 'exec' command: runs one command through the engine.
pub fn handle(args: Vec<String>, ctx: &AppContext) -> HandlerFuture<'_> {
    Box::pin(run(args, ctx))
}

async fn run(args: Vec<String>, ctx: &AppContext) -> Result<()> {
    let exec_args = ExecArgs::try_parse_from(&args)?;
    let options = ExecutionOptions {
        cwd: exec_args.cwd,
        env: commons::parse_env_pairs(&exec_args.env)?,
        timeout_ms: exec_args.timeout,
        shell: exec_args.shell,
    };
    let descriptor = describe_command(&exec_args.command, &exec_args.args);

    if !exec_args.json {
        commons::announce(&descriptor);
    }
    let outcome = ctx
        .engine
        .execute_command(&exec_args.command, &exec_args.args, &options)
        .await;

    if exec_args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&commons::JsonOutcome::new(&descriptor, &outcome))?
        );
    } else {
        commons::print_outcome(&outcome);
    }
    outcome?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_values_may_contain_commas() {
        let exec_args =
            ExecArgs::try_parse_from(["--env", "PATHS=a,b", "-e", "MODE=fast", "echo", "hi"]).unwrap();
        assert_eq!(exec_args.env, vec!["PATHS=a,b", "MODE=fast"]);
        assert_eq!(exec_args.command, "echo");
        assert_eq!(exec_args.args, vec!["hi"]);

        let env = commons::parse_env_pairs(&exec_args.env).unwrap();
        assert_eq!(env.get("PATHS").map(String::as_str), Some("a,b"));
        assert_eq!(env.get("MODE").map(String::as_str), Some("fast"));
    }
}

use crate::{
    cli::{
        args::{ToolArgs, ToolSubcommand},
        handlers::{AppContext, HandlerFuture, commons},
    },
    core::command_builder::{ToolAction, ToolCommandBuilder},
};
use anyhow::Result;
use clap::Parser;

/// Entry point for the 'tool' command: runs one task-tracking tool operation.
pub fn handle(args: Vec<String>, ctx: &AppContext) -> HandlerFuture<'_> {
    Box::pin(run(args, ctx))
}

async fn run(args: Vec<String>, ctx: &AppContext) -> Result<()> {
    let tool_args = ToolArgs::try_parse_from(&args)?;

    let mut builder = ToolCommandBuilder::new(ctx.config.tool.clone())?;
    if let Some(repo) = tool_args.repo {
        builder = builder.in_repo(repo);
    }
    let spec = builder.build(&to_action(tool_args.action))?;
    log::debug!("Tool invocation: {}", spec.descriptor());

    let outcome = ctx
        .engine
        .execute_command(&spec.command, &spec.args, &spec.options)
        .await;

    match &outcome {
        Ok(result) => println!("{}", render_output(&result.stdout, tool_args.raw)),
        Err(_) => commons::print_outcome(&outcome),
    }
    outcome?;
    Ok(())
}

fn to_action(subcommand: ToolSubcommand) -> ToolAction {
    match subcommand {
        ToolSubcommand::List { status, limit } => ToolAction::List { status, limit },
        ToolSubcommand::Show { id } => ToolAction::Show { id },
        ToolSubcommand::Ready => ToolAction::Ready,
        ToolSubcommand::Create {
            title,
            priority,
            issue_type,
            description,
        } => ToolAction::Create {
            title,
            priority,
            issue_type,
            description,
        },
        ToolSubcommand::Update {
            id,
            status,
            priority,
            assignee,
        } => ToolAction::Update {
            id,
            status,
            priority,
            assignee,
        },
        ToolSubcommand::Close { id, reason } => ToolAction::Close { id, reason },
        ToolSubcommand::Stats => ToolAction::Stats,
    }
}

/// Pretty-prints JSON output; anything else (or `--raw`) is passed through.
fn render_output(stdout: &str, raw: bool) -> String {
    if raw {
        return stdout.to_string();
    }
    serde_json::from_str::<serde_json::Value>(stdout)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| stdout.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_output_pretty_prints_json() {
        let rendered = render_output(r#"[{"id":"bd-1","status":"open"}]"#, false);
        assert!(rendered.contains("\n"));
        assert!(rendered.contains("\"id\": \"bd-1\""));
    }

    #[test]
    fn test_render_output_passes_text_through() {
        assert_eq!(render_output("not json", false), "not json");
        assert_eq!(render_output(r#"{"a":1}"#, true), r#"{"a":1}"#);
    }

    #[test]
    fn test_subcommands_map_to_actions() {
        let parsed = ToolArgs::try_parse_from(["update", "bd-4", "--status", "in_progress", "--repo", "/srv/r"])
            .unwrap();
        assert_eq!(parsed.repo.as_deref(), Some(std::path::Path::new("/srv/r")));
        assert_eq!(
            to_action(parsed.action),
            ToolAction::Update {
                id: "bd-4".into(),
                status: Some("in_progress".into()),
                priority: None,
                assignee: None,
            }
        );
    }
}

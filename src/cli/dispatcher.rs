use anyhow::Result;

use crate::cli::handlers::{self, AppContext, HandlerFuture};

// --- Command Definition and Registry ---

/// Defines a system command, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: for<'a> fn(Vec<String>, &'a AppContext) -> HandlerFuture<'a>,
}

/// The single source of truth for all system commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "config",
        aliases: &[],
        handler: handlers::config::handle,
    },
    CommandDefinition {
        name: "exec",
        aliases: &["x"],
        handler: handlers::exec::handle,
    },
    CommandDefinition {
        name: "seq",
        aliases: &["sequence"],
        handler: handlers::seq::handle,
    },
    CommandDefinition {
        name: "tool",
        aliases: &["bd"],
        handler: handlers::tool::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Routes the raw argument list to a handler.
///
/// `taskdeck <command> [args...]` runs a registered command. Anything else is treated as
/// an external command line and handed to `exec` unchanged.
pub async fn dispatch(all_args: Vec<String>, ctx: &AppContext) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);

    let Some((first, rest)) = all_args.split_first() else {
        println!("Nothing to run. See `taskdeck --help`.");
        return Ok(());
    };

    match find_command(first) {
        Some(command) => (command.handler)(rest.to_vec(), ctx).await,
        None => handlers::exec::handle(all_args.clone(), ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_command_by_name_and_alias() {
        assert_eq!(find_command("tool").map(|c| c.name), Some("tool"));
        assert_eq!(find_command("bd").map(|c| c.name), Some("tool"));
        assert_eq!(find_command("x").map(|c| c.name), Some("exec"));
        assert!(find_command("git").is_none());
    }

    #[test]
    fn test_registry_names_are_unique() {
        let mut names: Vec<&str> = COMMAND_REGISTRY
            .iter()
            .flat_map(|c| std::iter::once(c.name).chain(c.aliases.iter().copied()))
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}

use crate::{cli::handlers::{AppContext, HandlerFuture}, core::paths};
use anyhow::{Result, anyhow};
use colored::Colorize;

/// Prints the location and effective contents of the configuration.
pub fn handle(args: Vec<String>, ctx: &AppContext) -> HandlerFuture<'_> {
    Box::pin(async move { run(args, ctx) })
}

fn run(args: Vec<String>, ctx: &AppContext) -> Result<()> {
    if let Some(unexpected) = args.first() {
        return Err(anyhow!("'config' takes no arguments (got '{}').", unexpected));
    }
    match paths::get_config_path() {
        Ok(path) => println!("{} {}", "# config file:".dimmed(), path.display()),
        Err(e) => println!("{} {}", "# config file:".dimmed(), e),
    }
    print!("{}", ctx.config.to_toml()?);
    Ok(())
}

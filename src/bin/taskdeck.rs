// src/bin/taskdeck.rs

//! Command-line entry point of taskdeck.

use anyhow::Result;
use clap::Parser;
use colored::*;
use taskdeck::{
    ExecutionError, ExecutionErrorKind, TaskdeckConfig,
    cli::{Cli, dispatcher, handlers::AppContext},
    constants::INTERRUPTED_EXIT_CODE,
};

/// The main entry point of the `taskdeck` application.
/// It sets up logging, loads the configuration, wires Ctrl+C to the engine's kill-all,
/// dispatches to the correct handler, and performs centralized error handling.
#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()).await {
        // --- Centralized Error Handling ---
        // A command interrupted by Ctrl+C exits silently, like a shell would. The terminal
        // may deliver SIGINT to the child before the engine's kill-all reaches it.
        if let Some(exec_err) = e.downcast_ref::<ExecutionError>()
            && (exec_err.kind() == ExecutionErrorKind::Killed
                || exec_err.result().signal.as_deref() == Some("SIGINT"))
        {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }

        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let config = TaskdeckConfig::load()?;
    let ctx = AppContext::new(config);

    // Ctrl+C terminates every child the engine is supervising; the in-flight
    // call then settles as `Killed` and the process exits with 130.
    let engine = ctx.engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let signalled = engine.kill_all_processes();
            log::debug!("Interrupted; signalled {} process(es).", signalled);
        }
    });

    dispatcher::dispatch(cli.args, &ctx).await
}

// src/cli/handlers/mod.rs

//! This module contains the logic for each CLI action.

use crate::{core::config_loader::TaskdeckConfig, system::executor::ProcessEngine};
use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

/// Shared helpers used by multiple handlers.
pub mod commons;
/// `config`: prints the effective configuration.
pub mod config;
/// `exec`: runs one command.
pub mod exec;
/// `seq`: runs the steps of a sequence file.
pub mod seq;
/// `tool`: drives the task-tracking tool.
pub mod tool;

/// The boxed future every handler returns, so handlers can live in one registry.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Everything a handler needs: the loaded configuration and the shared engine.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Configuration loaded at startup.
    pub config: TaskdeckConfig,
    /// Engine shared by every handler and the Ctrl+C hook.
    pub engine: ProcessEngine,
}

impl AppContext {
    /// Builds the engine from the `[engine]` section of `config`.
    pub fn new(config: TaskdeckConfig) -> Self {
        let engine = ProcessEngine::new(config.engine.clone());
        Self { config, engine }
    }
}

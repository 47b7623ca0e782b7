// src/core/mod.rs

pub mod command_builder;
pub mod config_loader;
/// Config file location and path expansion.
pub mod paths;

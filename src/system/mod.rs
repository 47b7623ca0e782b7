//! # System Interaction Layer
//!
//! This module owns everything that touches child processes. It is the boundary between
//! callers (CLI handlers, the tool command builder) and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: The process execution engine. Launches children, enforces timeouts,
//!   answers kill-all requests, produces structured results and publishes lifecycle events.
//! - **`registry`**: The concurrency-safe map of processes the engine is tracking.
//! - **`process`**: Command construction, output capture, termination signals and exit
//!   status decoding.
//! - **`shell`**: Builds the platform shell invocation used in shell mode.

pub mod executor;
pub mod process;
pub mod registry;
pub mod shell;

// src/system/executor.rs

//! The process execution engine.
//!
//! Every call to [`ProcessEngine::execute_command`] launches one child process and
//! suspends until it terminates (exit, signal, timeout or kill-all) or fails to launch.
//! Lifecycle transitions are published on a broadcast channel as [`ProgressEvent`]s.

use crate::{
    core::config_loader::EngineConfig,
    models::{
        ActiveProcess, CommandResult, CommandSpec, ExecutionOptions, ProcessHandle,
        ProgressEvent, ProgressStage, describe_command, duration_to_ms,
    },
    system::{
        process::{self, OutputCapture},
        registry::{ProcessEntry, ProcessRegistry},
    },
};
use serde::Serialize;
use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::broadcast;

/// Classification of a failed invocation.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionErrorKind {
    /// The executable could not be located or launched.
    SpawnFailure,
    /// The process exceeded its timeout.
    Timeout,
    /// The process ran and exited with a nonzero status.
    NonZeroExit,
    /// The process was terminated by a signal the engine did not send for a kill-all.
    Signaled,
    /// The process was terminated through `kill_all_processes`.
    Killed,
}

impl fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SpawnFailure => "spawn failure",
            Self::Timeout => "timeout",
            Self::NonZeroExit => "non-zero exit",
            Self::Signaled => "signaled",
            Self::Killed => "killed",
        };
        f.write_str(name)
    }
}

/// Returned in place of a [`CommandResult`] when a process could not be completed.
/// Always carries the best result the engine could assemble.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ExecutionError {
    kind: ExecutionErrorKind,
    command: String,
    message: String,
    result: CommandResult,
}

impl ExecutionError {
    fn new(kind: ExecutionErrorKind, command: &str, message: String, result: CommandResult) -> Self {
        Self {
            kind,
            command: command.to_string(),
            message,
            result,
        }
    }

    fn spawn_failure(command: &str, reason: impl fmt::Display, elapsed: Duration) -> Self {
        Self::new(
            ExecutionErrorKind::SpawnFailure,
            command,
            format!("Command '{command}' could not be executed: {reason}"),
            CommandResult::not_launched(elapsed),
        )
    }

    fn cancelled(command: &str) -> Self {
        Self::new(
            ExecutionErrorKind::Killed,
            command,
            format!("Command '{command}' was cancelled before it finished."),
            CommandResult::not_launched(Duration::ZERO),
        )
    }

    /// What went wrong.
    pub fn kind(&self) -> ExecutionErrorKind {
        self.kind
    }

    /// The rendered command line that failed.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Human-readable description, the same text as `Display`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The partial result captured before the failure.
    pub fn result(&self) -> &CommandResult {
        &self.result
    }
}

/// How the supervising `select!` was resolved.
enum Termination {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Killed,
}

#[derive(Debug)]
struct EngineInner {
    registry: ProcessRegistry,
    events: broadcast::Sender<ProgressEvent>,
    config: EngineConfig,
}

/// Launches, supervises and tears down child processes.
///
/// Cloning is cheap and every clone shares the same registry and event stream. Separate
/// engines are fully independent of one another.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    inner: Arc<EngineInner>,
}

impl Default for ProcessEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ProcessEngine {
    /// Creates an engine with an empty registry and no subscribers.
    pub fn new(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(EngineInner {
                registry: ProcessRegistry::new(),
                events,
                config,
            }),
        }
    }

    /// The tuning this engine was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Subscribes to lifecycle events of every process launched from now on.
    ///
    /// Delivery is best effort: a subscriber that falls more than `event_capacity`
    /// events behind receives `RecvError::Lagged` and loses the oldest ones.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.inner.events.subscribe()
    }

    /// Number of processes currently tracked.
    pub fn active_process_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Snapshot of every process currently tracked.
    pub fn active_processes(&self) -> Vec<ActiveProcess> {
        self.inner.registry.active()
    }

    /// Requests termination of every tracked process and returns immediately.
    ///
    /// Launched processes receive `SIGTERM` before this returns; a process still being
    /// launched is signalled as soon as it starts. Each affected call settles with
    /// [`ExecutionErrorKind::Killed`]. Returns how many processes were signalled.
    pub fn kill_all_processes(&self) -> usize {
        let count = self.inner.registry.kill_all();
        if count > 0 {
            log::debug!("Kill requested for {} active process(es).", count);
        }
        count
    }

    /// Runs one command to completion.
    ///
    /// Resolves with the [`CommandResult`] when the process exits with status 0, and with
    /// an [`ExecutionError`] for every other outcome.
    pub async fn execute_command(
        &self,
        command: &str,
        args: &[String],
        options: &ExecutionOptions,
    ) -> Result<CommandResult, ExecutionError> {
        let descriptor = describe_command(command, args);
        let entry = self.inner.registry.register(descriptor.clone());
        let handle = entry.handle();
        self.emit(handle, ProgressStage::Starting, &descriptor);

        // Settles the handle if this future is dropped before reaching a terminal path.
        let abandoned = scopeguard::guard((), |()| {
            log::debug!("Call for process {} was dropped before it settled.", handle);
            self.settle(handle, ProgressStage::Failed, &descriptor);
        });

        let outcome = self
            .supervise(&entry, command, args, options, &descriptor)
            .await;
        scopeguard::ScopeGuard::into_inner(abandoned);

        let stage = if outcome.is_ok() {
            ProgressStage::Completed
        } else {
            ProgressStage::Failed
        };
        self.settle(handle, stage, &descriptor);
        outcome
    }

    /// Runs commands one after another, stopping at the first failure.
    ///
    /// On failure the error of the failing entry is returned unchanged and the results of
    /// the entries that already succeeded are discarded. Later entries are never launched.
    pub async fn execute_sequence(
        &self,
        commands: &[CommandSpec],
    ) -> Result<Vec<CommandResult>, ExecutionError> {
        let mut results = Vec::with_capacity(commands.len());
        for (position, spec) in commands.iter().enumerate() {
            log::debug!(
                "Sequence step {}/{}: {}",
                position + 1,
                commands.len(),
                spec.descriptor()
            );
            let result = self
                .execute_command(&spec.command, &spec.args, &spec.options)
                .await?;
            results.push(result);
        }
        Ok(results)
    }

    /// Runs a batch of commands concurrently. Results are returned in input order.
    pub async fn execute_parallel(
        &self,
        commands: &[CommandSpec],
    ) -> Vec<Result<CommandResult, ExecutionError>> {
        log::trace!("Executing parallel batch of {} commands.", commands.len());

        let tasks: Vec<_> = commands
            .iter()
            .cloned()
            .map(|spec| {
                let engine = self.clone();
                tokio::spawn(async move {
                    engine
                        .execute_command(&spec.command, &spec.args, &spec.options)
                        .await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for (task, spec) in tasks.into_iter().zip(commands) {
            let result = match task.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => Err(ExecutionError::cancelled(&spec.descriptor())),
            };
            results.push(result);
        }
        results
    }

    // --- Lifecycle internals ---

    async fn supervise(
        &self,
        entry: &ProcessEntry,
        command: &str,
        args: &[String],
        options: &ExecutionOptions,
        descriptor: &str,
    ) -> Result<CommandResult, ExecutionError> {
        let started = Instant::now();
        if command.trim().is_empty() {
            return Err(ExecutionError::spawn_failure(
                descriptor,
                "No command specified to run.",
                started.elapsed(),
            ));
        }

        let mut child = match process::build_command(command, args, options).spawn() {
            Ok(child) => child,
            Err(e) => {
                log::debug!("Failed to launch '{}': {}", descriptor, e);
                return Err(ExecutionError::spawn_failure(descriptor, e, started.elapsed()));
            }
        };
        entry.set_pid(child.id());
        log::debug!(
            "Launched process {} (PID: {:?}): {}",
            entry.handle(),
            child.id(),
            descriptor
        );
        self.emit(entry.handle(), ProgressStage::Running, descriptor);

        let capture = OutputCapture::attach(&mut child);
        let timeout = options.timeout().or_else(|| self.inner.config.default_timeout());
        let timer = async move {
            match timeout {
                Some(limit) => {
                    tokio::time::sleep(limit).await;
                    limit
                }
                None => std::future::pending().await,
            }
        };
        tokio::pin!(timer);

        // A natural exit wins over a timer or kill request that becomes ready at the same time.
        let termination = tokio::select! {
            biased;
            status = child.wait() => Termination::Exited(status),
            limit = &mut timer => Termination::TimedOut(limit),
            () = entry.killed() => Termination::Killed,
        };

        let mut drain_limit = self.inner.config.output_drain();
        let status = match &termination {
            Termination::Exited(Ok(status)) => Some(*status),
            Termination::Exited(Err(e)) => {
                log::warn!("Could not await process {}: {}", entry.handle(), e);
                None
            }
            Termination::TimedOut(_) | Termination::Killed => {
                if let Err(e) = process::terminate(&mut child) {
                    log::warn!(
                        "Failed to signal process {} (PID: {:?}): {}",
                        entry.handle(),
                        child.id(),
                        e
                    );
                }
                // Waiting for the exit and draining its output share one deadline.
                let budget = self.termination_budget(&termination);
                let deadline = Instant::now() + budget;
                let status = self.await_after_signal(child, entry.handle(), budget).await;
                drain_limit = drain_limit.min(deadline.saturating_duration_since(Instant::now()));
                status
            }
        };
        entry.clear_pid();
        let elapsed = started.elapsed();
        let kill_requested = entry.kill_requested();

        let (stdout, stderr) = capture.finish(drain_limit).await;
        let (exit_code, signal) = status.map(process::exit_details).unwrap_or((None, None));
        let result = CommandResult {
            success: exit_code == Some(0) && signal.is_none(),
            exit_code,
            signal,
            stdout,
            stderr,
            duration_ms: duration_to_ms(elapsed),
        };

        classify(termination, kill_requested, descriptor, result)
    }

    /// How long a signalled child gets to exit and flush its output.
    ///
    /// A timed-out call is capped at half its timeout so it is always reported within
    /// twice the configured limit.
    fn termination_budget(&self, termination: &Termination) -> Duration {
        let grace = self.inner.config.termination_grace();
        match termination {
            Termination::TimedOut(limit) => grace.min(*limit / 2),
            _ => grace,
        }
    }

    /// Waits up to `grace` for a signalled child to exit.
    ///
    /// A child that outlives the grace period is not force killed: it is handed to a
    /// background task that reaps it whenever it does exit.
    async fn await_after_signal(
        &self,
        mut child: tokio::process::Child,
        handle: ProcessHandle,
        grace: Duration,
    ) -> Option<ExitStatus> {
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                log::warn!("Could not await signalled process {}: {}", handle, e);
                None
            }
            Err(_) => {
                log::warn!(
                    "Process {} did not exit within {:?} of the termination request; detaching.",
                    handle,
                    grace
                );
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
                None
            }
        }
    }

    /// Removes the handle and emits its terminal event, once.
    fn settle(&self, handle: ProcessHandle, stage: ProgressStage, command: &str) {
        if self.inner.registry.remove(handle).is_some() {
            self.emit(handle, stage, command);
        }
    }

    fn emit(&self, handle: ProcessHandle, stage: ProgressStage, command: &str) {
        log::trace!("Process {} -> {}", handle, stage);
        // Sending only fails when nobody is subscribed.
        let _ = self.inner.events.send(ProgressEvent {
            handle,
            stage,
            command: command.to_string(),
        });
    }
}

/// Maps how the call ended to its outcome. A process that a kill-all reached counts as
/// killed unless it had already finished successfully.
fn classify(
    termination: Termination,
    kill_requested: bool,
    command: &str,
    result: CommandResult,
) -> Result<CommandResult, ExecutionError> {
    let (kind, message) = match termination {
        Termination::TimedOut(limit) => (
            ExecutionErrorKind::Timeout,
            format!(
                "Command '{command}' timed out after {} ms.",
                duration_to_ms(limit)
            ),
        ),
        Termination::Killed => (
            ExecutionErrorKind::Killed,
            format!("Command '{command}' was killed before it finished."),
        ),
        Termination::Exited(Err(e)) => (
            ExecutionErrorKind::NonZeroExit,
            format!("Command '{command}' could not be awaited: {e}"),
        ),
        Termination::Exited(Ok(_)) => {
            if result.success {
                return Ok(result);
            }
            match (&result.signal, result.exit_code) {
                _ if kill_requested => (
                    ExecutionErrorKind::Killed,
                    format!("Command '{command}' was killed before it finished."),
                ),
                (Some(signal), _) => (
                    ExecutionErrorKind::Signaled,
                    format!("Command '{command}' was terminated by signal {signal}."),
                ),
                (None, Some(code)) => (
                    ExecutionErrorKind::NonZeroExit,
                    format!("Command '{command}' exited with a non-zero error code ({code})."),
                ),
                (None, None) => (
                    ExecutionErrorKind::NonZeroExit,
                    format!("Command '{command}' exited without an exit code."),
                ),
            }
        }
    };
    Err(ExecutionError::new(kind, command, message, result))
}

// src/system/registry.rs

//! Active-process registry.
//!
//! The registry is the only shared mutable state of the engine. Insertions happen on
//! launch, removals on the terminal path of each call, and `kill_all` iterates a
//! snapshot so it never holds the lock while signalling. A launched process is signalled
//! from `kill_all` itself; one that has not launched yet is signalled by its supervising
//! call as soon as it does.

use crate::models::{ActiveProcess, ProcessHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio::sync::Notify;

/// Bookkeeping for one tracked process.
#[derive(Debug)]
pub struct ProcessEntry {
    handle: ProcessHandle,
    command: String,
    started_at: SystemTime,
    /// 0 until the process is launched.
    pid: AtomicU32,
    kill_requested: AtomicBool,
    kill_signal: Notify,
}

impl ProcessEntry {
    fn new(handle: ProcessHandle, command: String) -> Self {
        Self {
            handle,
            command,
            started_at: SystemTime::now(),
            pid: AtomicU32::new(0),
            kill_requested: AtomicBool::new(false),
            kill_signal: Notify::new(),
        }
    }

    /// The handle this entry is registered under.
    pub fn handle(&self) -> ProcessHandle {
        self.handle
    }

    /// Records the OS process id once the child is launched.
    pub fn set_pid(&self, pid: Option<u32>) {
        if let Some(pid) = pid {
            self.pid.store(pid, Ordering::Release);
        }
    }

    /// Forgets the process id once the child has been reaped, so a recycled pid is
    /// never signalled.
    pub fn clear_pid(&self) {
        self.pid.store(0, Ordering::Release);
    }

    /// The OS process id, if the child has been launched.
    pub fn pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::Acquire) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Marks the process for termination and wakes its supervising call.
    ///
    /// `Notify::notify_one` stores a permit when nobody is waiting yet, so a request that
    /// arrives before the supervisor starts listening is not lost.
    pub fn request_kill(&self) {
        self.kill_requested.store(true, Ordering::Release);
        self.kill_signal.notify_one();
    }

    /// Whether `request_kill` has been called for this entry.
    pub fn kill_requested(&self) -> bool {
        self.kill_requested.load(Ordering::Acquire)
    }

    /// Resolves once a kill has been requested.
    pub async fn killed(&self) {
        self.kill_signal.notified().await;
    }

    /// A read-only view for callers outside the engine.
    pub fn snapshot(&self) -> ActiveProcess {
        ActiveProcess {
            handle: self.handle,
            command: self.command.clone(),
            pid: self.pid(),
            started_at: self.started_at,
        }
    }
}

/// Concurrency-safe map of every process the engine currently tracks.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: Mutex<HashMap<ProcessHandle, Arc<ProcessEntry>>>,
}

impl ProcessRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while the lock is held cannot leave the map half-updated, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<ProcessHandle, Arc<ProcessEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates a new handle and starts tracking it.
    pub fn register(&self, command: String) -> Arc<ProcessEntry> {
        let handle = ProcessHandle::new();
        let entry = Arc::new(ProcessEntry::new(handle, command));
        self.lock().insert(handle, Arc::clone(&entry));
        entry
    }

    /// Stops tracking a handle. Returns the entry only to the first caller, so each
    /// handle is removed exactly once even when terminal paths race.
    pub fn remove(&self, handle: ProcessHandle) -> Option<Arc<ProcessEntry>> {
        self.lock().remove(&handle)
    }

    /// Number of tracked processes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no process is tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Requests termination of every tracked process and returns how many were signalled.
    ///
    /// Launched processes receive `SIGTERM` before this returns. Works on a snapshot
    /// taken under the lock; entries registered afterwards are not affected.
    pub fn kill_all(&self) -> usize {
        let snapshot: Vec<Arc<ProcessEntry>> = self.lock().values().cloned().collect();
        for entry in &snapshot {
            log::debug!(
                "Requesting termination of process {} ('{}').",
                entry.handle,
                entry.command
            );
            entry.request_kill();
            signal_entry(entry);
        }
        snapshot.len()
    }

    /// Snapshot of every tracked process.
    pub fn active(&self) -> Vec<ActiveProcess> {
        self.lock().values().map(|entry| entry.snapshot()).collect()
    }
}

#[cfg(unix)]
fn signal_entry(entry: &ProcessEntry) {
    let Some(pid) = entry.pid() else {
        return;
    };
    if let Err(e) = crate::system::process::terminate_pid(pid) {
        // ESRCH: the child exited between the snapshot and the signal.
        log::debug!("Could not signal process {} (PID: {}): {}", entry.handle, pid, e);
    }
}

// Without pid-based signals the supervising call terminates the child through its handle.
#[cfg(not(unix))]
fn signal_entry(_entry: &ProcessEntry) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_register_and_remove_exactly_once() {
        let registry = ProcessRegistry::new();
        assert!(registry.is_empty());

        let entry = registry.register("echo hi".to_string());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(entry.handle()).is_some());
        assert!(registry.remove(entry.handle()).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_pid_is_unknown_until_set() {
        let registry = ProcessRegistry::new();
        let entry = registry.register("sleep 1".to_string());
        assert_eq!(entry.pid(), None);
        entry.set_pid(None);
        assert_eq!(entry.pid(), None);
        entry.set_pid(Some(4242));
        assert_eq!(entry.pid(), Some(4242));
        entry.clear_pid();
        assert_eq!(entry.pid(), None);
        entry.set_pid(Some(4242));

        let active = registry.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active.first().map(|p| p.pid), Some(Some(4242)));
        assert_eq!(active.first().map(|p| p.command.as_str()), Some("sleep 1"));
    }

    #[test]
    fn test_kill_all_marks_every_entry() {
        let registry = ProcessRegistry::new();
        let a = registry.register("a".to_string());
        let b = registry.register("b".to_string());

        assert_eq!(registry.kill_all(), 2);
        assert!(a.kill_requested());
        assert!(b.kill_requested());
        // Killing does not remove: removal belongs to the supervising call.
        assert_eq!(registry.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_kill_all_signals_launched_processes_itself() {
        use std::os::unix::process::ExitStatusExt;

        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let registry = ProcessRegistry::new();
        let launched = registry.register("sleep 30".to_string());
        launched.set_pid(Some(child.id()));
        let pending = registry.register("not launched yet".to_string());

        assert_eq!(registry.kill_all(), 2);

        // Nothing polls the entries here, so the signal must come from `kill_all`.
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(15));
        assert!(pending.kill_requested());
    }

    #[tokio::test]
    async fn test_kill_request_before_waiting_is_not_lost() {
        let registry = ProcessRegistry::new();
        let entry = registry.register("late listener".to_string());
        registry.kill_all();

        let woke = tokio::time::timeout(Duration::from_secs(1), entry.killed()).await;
        assert!(woke.is_ok());
    }
}

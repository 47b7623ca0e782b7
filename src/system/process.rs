// src/system/process.rs

//! OS process boundary: command construction, output capture, termination
//! requests and exit status decoding.

use crate::{
    constants::READ_CHUNK_SIZE,
    models::{ExecutionOptions, trim_trailing_newline},
    system::shell,
};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Builds the `tokio` command for one invocation.
///
/// The child inherits the host environment with `options.env` merged on top. Output is
/// piped for capture and stdin is closed. `kill_on_drop` ensures a call that is
/// abandoned mid-flight does not leave its child running.
pub fn build_command(command: &str, args: &[String], options: &ExecutionOptions) -> Command {
    let mut cmd = if options.shell {
        let invocation = shell::shell_invocation(command, args);
        let mut cmd = Command::new(invocation.program);
        cmd.args(invocation.args);
        cmd
    } else {
        let mut cmd = Command::new(command);
        cmd.args(args);
        cmd
    };

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(dunce::simplified(cwd));
    }
    cmd.envs(&options.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Issues a graceful termination request (`SIGTERM`) to the child.
///
/// Does not wait for the process to exit.
#[cfg(unix)]
pub fn terminate(child: &mut Child) -> io::Result<()> {
    // `None` means the child has already been reaped.
    match child.id() {
        Some(pid) => terminate_pid(pid),
        None => Ok(()),
    }
}

/// Sends `SIGTERM` to a process by id, without needing its `Child`.
#[cfg(unix)]
pub fn terminate_pid(pid: u32) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw_pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    kill(Pid::from_raw(raw_pid), Signal::SIGTERM).map_err(io::Error::from)
}

/// Issues a termination request to the child. `Child::start_kill` is the only
/// primitive available off Unix.
#[cfg(not(unix))]
pub fn terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

/// Splits an exit status into `(exit_code, signal_name)`.
pub fn exit_details(status: ExitStatus) -> (Option<i32>, Option<String>) {
    (status.code(), signal_name(status))
}

#[cfg(unix)]
fn signal_name(status: ExitStatus) -> Option<String> {
    use nix::sys::signal::Signal;
    use std::os::unix::process::ExitStatusExt;

    status.signal().map(|raw| {
        Signal::try_from(raw)
            .map(|signal| signal.as_str().to_string())
            .unwrap_or_else(|_| format!("SIG{raw}"))
    })
}

#[cfg(not(unix))]
fn signal_name(_status: ExitStatus) -> Option<String> {
    None
}

// --- Output Capture ---

#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn append(&self, chunk: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(chunk);
    }

    fn take_text(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner));
        trim_trailing_newline(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(Debug)]
struct StreamCapture {
    buffer: SharedBuffer,
    reader: Option<JoinHandle<()>>,
}

impl StreamCapture {
    fn attach<R>(stream: Option<R>, label: &'static str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = SharedBuffer::default();
        let reader = stream.map(|stream| tokio::spawn(drain(stream, buffer.clone(), label)));
        Self { buffer, reader }
    }

    async fn finish(self, drain_limit: Duration) -> String {
        if let Some(mut reader) = self.reader {
            if tokio::time::timeout(drain_limit, &mut reader).await.is_err() {
                // Something else (typically a grandchild) still holds the pipe open.
                log::debug!("Output pipe still open after exit; keeping partial output.");
                reader.abort();
            }
        }
        self.buffer.take_text()
    }
}

async fn drain<R>(mut stream: R, buffer: SharedBuffer, label: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.append(chunk.get(..n).unwrap_or_default()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Error reading {} of child process: {}", label, e);
                break;
            }
        }
    }
}

/// Incremental capture of a child's stdout and stderr.
#[derive(Debug)]
pub struct OutputCapture {
    stdout: StreamCapture,
    stderr: StreamCapture,
}

impl OutputCapture {
    /// Takes the child's pipes and starts accumulating them in background tasks.
    pub fn attach(child: &mut Child) -> Self {
        Self {
            stdout: StreamCapture::attach(child.stdout.take(), "stdout"),
            stderr: StreamCapture::attach(child.stderr.take(), "stderr"),
        }
    }

    /// Waits up to `drain_limit` for both pipes to close and returns `(stdout, stderr)`
    /// with one trailing newline removed from each. The streams share one deadline.
    pub async fn finish(self, drain_limit: Duration) -> (String, String) {
        tokio::join!(
            self.stdout.finish(drain_limit),
            self.stderr.finish(drain_limit)
        )
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_collects_both_streams() {
        let options = ExecutionOptions::default();
        let mut cmd = build_command(
            "sh",
            &["-c".to_string(), "printf 'out\\n'; printf 'err\\n' >&2".to_string()],
            &options,
        );
        let mut child = cmd.spawn().unwrap();
        let capture = OutputCapture::attach(&mut child);
        let status = child.wait().await.unwrap();
        let (stdout, stderr) = capture.finish(Duration::from_millis(500)).await;

        assert_eq!(exit_details(status), (Some(0), None));
        assert_eq!(stdout, "out");
        assert_eq!(stderr, "err");
    }

    #[tokio::test]
    async fn test_drain_limit_is_shared_by_both_streams() {
        // The background sleep inherits both pipes and keeps them open.
        let mut cmd = build_command(
            "sh",
            &["-c".to_string(), "echo out; echo err >&2; sleep 5 &".to_string()],
            &ExecutionOptions::default(),
        );
        let mut child = cmd.spawn().unwrap();
        let capture = OutputCapture::attach(&mut child);
        child.wait().await.unwrap();

        let started = std::time::Instant::now();
        let (stdout, stderr) = capture.finish(Duration::from_millis(300)).await;

        assert!(started.elapsed() < Duration::from_millis(550));
        assert_eq!(stdout, "out");
        assert_eq!(stderr, "err");
    }

    #[tokio::test]
    async fn test_terminate_pid_signals_without_the_child() {
        let mut cmd = build_command("sleep", &["5".to_string()], &ExecutionOptions::default());
        let mut child = cmd.spawn().unwrap();
        terminate_pid(child.id().unwrap()).unwrap();
        let status = child.wait().await.unwrap();

        assert_eq!(exit_details(status), (None, Some("SIGTERM".to_string())));
    }

    #[tokio::test]
    async fn test_terminate_sends_sigterm() {
        let mut cmd = build_command("sleep", &["5".to_string()], &ExecutionOptions::default());
        let mut child = cmd.spawn().unwrap();
        terminate(&mut child).unwrap();
        let status = child.wait().await.unwrap();

        assert_eq!(exit_details(status), (None, Some("SIGTERM".to_string())));
    }

    #[tokio::test]
    async fn test_terminate_after_reap_is_a_no_op() {
        let mut cmd = build_command("true", &[], &ExecutionOptions::default());
        let mut child = cmd.spawn().unwrap();
        child.wait().await.unwrap();
        assert!(terminate(&mut child).is_ok());
    }

    #[tokio::test]
    async fn test_env_is_merged_over_ambient() {
        let options = ExecutionOptions::default().with_env("TASKDECK_PROCESS_TEST", "merged");
        let mut cmd = build_command(
            "sh",
            &["-c".to_string(), "printf '%s:%s' \"$TASKDECK_PROCESS_TEST\" \"${PATH:+has-path}\"".to_string()],
            &options,
        );
        let mut child = cmd.spawn().unwrap();
        let capture = OutputCapture::attach(&mut child);
        child.wait().await.unwrap();
        let (stdout, _) = capture.finish(Duration::from_millis(500)).await;

        assert_eq!(stdout, "merged:has-path");
    }
}

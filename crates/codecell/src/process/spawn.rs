//! Running a child process under a wall clock deadline
//!
//! Output is read concurrently on both pipes so a chatty child never blocks
//! on a full pipe, and whatever was captured before a kill is kept.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::process::ProcessError;
use crate::process::command::ProcessCommand;

/// How long readers may keep draining once the child is gone
const DRAIN_GRACE: Duration = Duration::from_millis(500);

const READ_CHUNK: usize = 8192;

/// Outcome of one child process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Terminating signal
    pub signal: Option<i32>,
    /// The deadline passed and the process group was killed
    pub timed_out: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// At least one stream hit the capture cap
    pub truncated: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    /// Exited with status 0 before the deadline
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// stdout and stderr joined, the way compiler output is shown
    pub fn combined_text(&self) -> String {
        let stdout = self.stdout_text();
        let stderr = self.stderr_text();
        match (stdout.is_empty(), stderr.is_empty()) {
            (_, true) => stdout,
            (true, false) => stderr,
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    truncated: bool,
}

type SharedCapture = Arc<Mutex<Capture>>;

/// Run `command` to completion or until its deadline passes
///
/// On timeout the child's whole process group is killed with SIGKILL; the
/// output captured up to that point is returned with `timed_out` set.
/// Stray members of the group are also killed after a normal exit.
#[instrument(skip(command), fields(program = %command.program, timeout = ?command.timeout))]
pub async fn run_with_deadline(command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
    let started = Instant::now();

    let mut child = command
        .build()
        .spawn()
        .map_err(|source| ProcessError::SpawnFailed {
            program: command.program.clone(),
            source,
        })?;
    let pid = child.id();
    debug!(?pid, "spawned");

    let stdout = child
        .stdout
        .take()
        .ok_or(ProcessError::PipeUnavailable("stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or(ProcessError::PipeUnavailable("stderr"))?;

    if let (Some(mut pipe), Some(data)) = (child.stdin.take(), command.stdin.clone()) {
        tokio::spawn(async move {
            // The child may exit without reading its input
            if let Err(e) = pipe.write_all(&data).await {
                debug!(error = %e, "stdin write stopped");
            }
        });
    }

    let stdout_capture = SharedCapture::default();
    let stderr_capture = SharedCapture::default();
    let stdout_task = tokio::spawn(read_capped(
        stdout,
        command.max_output,
        stdout_capture.clone(),
    ));
    let stderr_task = tokio::spawn(read_capped(
        stderr,
        command.max_output,
        stderr_capture.clone(),
    ));

    let (status, timed_out) = match tokio::time::timeout(command.timeout, child.wait()).await {
        Ok(status) => {
            let status = status?;
            kill_group(pid);
            (Some(status), false)
        }
        Err(_) => {
            warn!(?pid, "deadline exceeded, killing process group");
            kill_group(pid);
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "child already gone");
            }
            (child.wait().await.ok(), true)
        }
    };

    drain(stdout_task).await;
    drain(stderr_task).await;

    let (stdout, stdout_truncated) = take_capture(&stdout_capture);
    let (stderr, stderr_truncated) = take_capture(&stderr_capture);

    let output = ProcessOutput {
        exit_code: status.and_then(|s| s.code()),
        signal: status.and_then(exit_signal),
        timed_out,
        stdout,
        stderr,
        truncated: stdout_truncated || stderr_truncated,
        elapsed: started.elapsed(),
    };

    debug!(
        exit_code = ?output.exit_code,
        signal = ?output.signal,
        timed_out,
        truncated = output.truncated,
        elapsed = ?output.elapsed,
        "process finished"
    );

    Ok(output)
}

/// Read a stream to EOF, keeping at most `cap` bytes
///
/// Bytes past the cap are read and discarded so the writer never blocks.
async fn read_capped<R>(mut reader: R, cap: usize, capture: SharedCapture)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "pipe read failed");
                break;
            }
        };

        let mut capture = capture.lock().unwrap_or_else(PoisonError::into_inner);
        let room = cap.saturating_sub(capture.bytes.len());
        if n > room {
            capture.truncated = true;
        }
        capture.bytes.extend_from_slice(&chunk[..n.min(room)]);
    }
}

/// Give a reader task a short grace period to reach EOF
///
/// A descendant that left the process group can hold the pipe open forever.
async fn drain(mut task: JoinHandle<()>) {
    if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
        warn!("output pipe still open after exit, abandoning reader");
        task.abort();
    }
}

fn take_capture(capture: &SharedCapture) -> (Vec<u8>, bool) {
    let mut capture = capture.lock().unwrap_or_else(PoisonError::into_inner);
    (std::mem::take(&mut capture.bytes), capture.truncated)
}

/// SIGKILL every process in the child's group
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };

    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid, error = %e, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[cfg(unix)]
fn exit_signal(status: std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: std::process::ExitStatus) -> Option<i32> {
    None
}

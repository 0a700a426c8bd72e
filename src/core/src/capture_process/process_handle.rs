use log::{debug, info, warn};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

use super::command::ToolCommand;
use super::output::{forward_lines, OutputLines, LINE_CHANNEL_CAPACITY};
use super::types::{ReapOutcome, StdioStream, TerminateOutcome};
use crate::error_handling::types::CaptureError;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const KILL_COLLECT_TIMEOUT: Duration = Duration::from_secs(2);
const STARTUP_OUTPUT_LINES: usize = 10;
const STARTUP_LINE_TIMEOUT: Duration = Duration::from_millis(200);

/// A running external capture process.
///
/// The child is the leader of its own process group, so signals reach every
/// helper it forks (and `sudo`'s child when elevated). Stdout and stderr are
/// read by two background tasks and merged into one [`OutputLines`] channel.
pub struct CaptureProcess {
    pid: u32,
    program: String,
    child: Mutex<Child>,
    output: Mutex<Option<OutputLines>>,
    signalled: AtomicBool,
}

impl std::fmt::Debug for CaptureProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureProcess")
            .field("pid", &self.pid)
            .field("program", &self.program)
            .field("signalled", &self.signalled.load(Ordering::SeqCst))
            .finish()
    }
}

impl CaptureProcess {
    /// Spawns `command` in a new process group with piped output.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(command: &ToolCommand) -> Result<Self, CaptureError> {
        let mut cmd = command.to_command();
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let mut child = cmd.spawn().map_err(|source| CaptureError::SpawnFailed {
            program: command.display(),
            source,
        })?;

        let pid = child.id().ok_or_else(|| CaptureError::ExitedDuringStartup {
            status: String::from("reaped before its pid was read"),
            output: Vec::new(),
        })?;

        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, StdioStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, StdioStream::Stderr, tx));
        }

        info!("Started {} (pid/pgid {})", command.display(), pid);

        Ok(Self {
            pid,
            program: command.program.clone(),
            child: Mutex::new(child),
            output: Mutex::new(Some(OutputLines::new(rx))),
            signalled: AtomicBool::new(false),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Hands out the merged output channel. Only the first caller gets it.
    pub fn take_output(&self) -> Option<OutputLines> {
        lock(&self.output).take()
    }

    /// Whether [`terminate`](Self::terminate) has already sent its signal.
    pub fn termination_requested(&self) -> bool {
        self.signalled.load(Ordering::SeqCst)
    }

    /// Non-blocking exit check of the group leader.
    pub fn try_exit_status(&self) -> Option<ExitStatus> {
        match lock(&self.child).try_wait() {
            Ok(status) => status,
            Err(e) => {
                debug!("try_wait on pid {} failed: {}", self.pid, e);
                None
            }
        }
    }

    /// Waits out the readiness window. A child that is already gone at any
    /// point inside `grace` is reported together with its first stderr lines.
    pub async fn wait_ready(&self, grace: Duration) -> Result<(), CaptureError> {
        let deadline = Instant::now() + grace;
        loop {
            if let Some(status) = self.try_exit_status() {
                let output = self.drain_startup_stderr().await;
                warn!(
                    "{} (pid {}) exited during startup: {}",
                    self.program, self.pid, status
                );
                return Err(CaptureError::ExitedDuringStartup {
                    status: status.to_string(),
                    output,
                });
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("{} (pid {}) survived startup grace", self.program, self.pid);
                return Ok(());
            }
            sleep(EXIT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn drain_startup_stderr(&self) -> Vec<String> {
        let Some(mut lines) = self.take_output() else {
            return Vec::new();
        };
        let mut collected = Vec::new();
        while collected.len() < STARTUP_OUTPUT_LINES {
            match timeout(STARTUP_LINE_TIMEOUT, lines.next_line()).await {
                Ok(Some(line)) => {
                    if line.stream == StdioStream::Stderr && !line.text.trim().is_empty() {
                        collected.push(line.text.trim().to_string());
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
        collected
    }

    /// Sends SIGTERM to the whole process group, at most once per process.
    ///
    /// A group that no longer exists is not an error.
    pub fn terminate(&self) -> Result<TerminateOutcome, CaptureError> {
        if self.signalled.swap(true, Ordering::SeqCst) {
            debug!("pgid {} already signalled, skipping SIGTERM", self.pid);
            return Ok(TerminateOutcome::AlreadyTerminated);
        }
        match signal_group(self.pid, libc::SIGTERM) {
            Ok(true) => {
                debug!("SIGTERM sent to pgid {}", self.pid);
                Ok(TerminateOutcome::Signalled)
            }
            Ok(false) => {
                debug!("pgid {} already gone", self.pid);
                Ok(TerminateOutcome::AlreadyExited)
            }
            Err(e) => Err(CaptureError::SignalFailed(e)),
        }
    }

    /// Waits up to `grace` for the leader to exit, then SIGKILLs the group.
    pub async fn reap(&self, grace: Duration) -> Result<ReapOutcome, CaptureError> {
        if let Some(status) = self.wait_for_exit(grace).await {
            debug!("{} (pid {}) reaped: {}", self.program, self.pid, status);
            return Ok(ReapOutcome::Exited(status));
        }

        warn!(
            "{} (pid {}) still running after {:?}, sending SIGKILL",
            self.program, self.pid, grace
        );
        signal_group(self.pid, libc::SIGKILL).map_err(CaptureError::SignalFailed)?;
        Ok(ReapOutcome::Killed(self.wait_for_exit(KILL_COLLECT_TIMEOUT).await))
    }

    async fn wait_for_exit(&self, limit: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = self.try_exit_status() {
                return Some(status);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            sleep(EXIT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

impl Drop for CaptureProcess {
    fn drop(&mut self) {
        if self.try_exit_status().is_some() {
            return;
        }
        warn!(
            "{} (pid {}) dropped while still running, killing its process group",
            self.program, self.pid
        );
        if let Err(e) = signal_group(self.pid, libc::SIGKILL) {
            warn!("Failed to kill pgid {}: {}", self.pid, e);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Signals process group `pgid`. Returns `Ok(false)` when the group no
/// longer exists.
fn signal_group(pgid: u32, signal: libc::c_int) -> Result<bool, io::Error> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pgid out of range"))?;
    if pgid <= 1 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to signal process group {}", pgid),
        ));
    }
    // SAFETY: killpg has no memory-safety preconditions.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(false)
    } else {
        Err(err)
    }
}

//! Common data types used across the capture_process subsystem.

use serde::Serialize;

/// Which pipe of the child a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StdioStream {
    Stdout,
    Stderr,
}

/// One decoded line of child output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: StdioStream,
    pub text: String,
}

/// Result of asking a capture process to terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminateOutcome {
    /// SIGTERM was delivered to the process group.
    Signalled,
    /// The group was already gone; nothing was signalled.
    AlreadyExited,
    /// An earlier call already signalled the group; nothing was sent again.
    AlreadyTerminated,
}

/// How the group leader ended when it was reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// The leader exited on its own within the grace period.
    Exited(std::process::ExitStatus),
    /// The grace period ran out and the group was sent SIGKILL. Carries the
    /// status if the leader was collected afterwards.
    Killed(Option<std::process::ExitStatus>),
}

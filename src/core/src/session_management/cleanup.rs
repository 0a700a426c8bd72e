use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::session::ScanSession;
use super::types::{EndReason, ScanEvent, SessionState};
use crate::capture_process::{ReapOutcome, TerminateOutcome};
use crate::error_handling::types::CleanupError;

/// What one teardown did. Failures are recorded here and logged, never
/// retried.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub reason: Option<EndReason>,
    pub terminate: Option<TerminateOutcome>,
    pub reap: Option<ReapOutcome>,
    pub removed: Vec<PathBuf>,
    pub errors: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One-shot guard around a session's teardown.
#[derive(Debug, Default)]
pub struct CleanupCoordinator {
    started: AtomicBool,
    runs: AtomicUsize,
    report: Mutex<Option<CleanupReport>>,
}

impl CleanupCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the teardown. Only the first caller gets `true`.
    fn claim(&self) -> bool {
        let first = !self.started.swap(true, Ordering::SeqCst);
        if first {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
        first
    }

    pub fn has_run(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Error messages of the finished teardown, if it ran.
    pub fn error_messages(&self) -> Option<Vec<String>> {
        let report = self.report.lock().unwrap_or_else(|p| p.into_inner());
        report
            .as_ref()
            .map(|r| r.errors.iter().map(|e| e.to_string()).collect())
    }

    /// Artifact paths the finished teardown removed, if it ran.
    pub fn removed_paths(&self) -> Option<Vec<PathBuf>> {
        let report = self.report.lock().unwrap_or_else(|p| p.into_inner());
        report.as_ref().map(|r| r.removed.clone())
    }

    fn store(&self, report: CleanupReport) {
        *self.report.lock().unwrap_or_else(|p| p.into_inner()) = Some(report);
    }
}

/// Tears `session` down: terminate and reap the process group, remove the
/// artifacts, send every subscriber its terminal event and close their
/// channels. Runs at most once per session; later calls return `false`
/// without doing anything.
pub async fn run(session: &ScanSession, reason: EndReason) -> bool {
    if !session.cleanup.claim() {
        debug!("[{}] Cleanup already ran, skipping", session.id());
        return false;
    }
    info!("[{}] Cleaning up ({})", session.id(), reason);
    session.set_state(SessionState::Stopping);

    let mut report = CleanupReport {
        reason: Some(reason.clone()),
        ..Default::default()
    };

    let process = session.process();
    match process.terminate() {
        Ok(outcome) => report.terminate = Some(outcome),
        Err(e) => {
            warn!("[{}] {}", session.id(), e);
            report.errors.push(CleanupError::Terminate(e));
        }
    }
    match process
        .reap(session.settings().capture.terminate_grace())
        .await
    {
        Ok(outcome) => report.reap = Some(outcome),
        Err(e) => {
            error!("[{}] Failed to reap capture process: {}", session.id(), e);
            report.errors.push(CleanupError::Terminate(e));
        }
    }

    let (removed, errors) = session.artifacts().remove_all();
    report.removed = removed;
    report.errors.extend(errors);

    let terminal = if reason.is_failure() {
        ScanEvent::Error {
            message: reason.to_string(),
        }
    } else {
        ScanEvent::End {
            reason: reason.to_string(),
        }
    };
    let notified = {
        let mut shared = session.shared();
        shared.terminal_event = Some(terminal.clone());
        let subscribers = std::mem::take(&mut shared.subscribers);
        let count = subscribers.len();
        for tx in subscribers.into_values() {
            let _ = tx.send(terminal.clone());
        }
        count
    };

    let final_state = if reason.is_failure() || !report.is_clean() {
        SessionState::Failed
    } else {
        SessionState::Stopped
    };
    info!(
        "[{}] Cleanup finished: {:?}, {} artifact(s) removed, {} subscriber(s) notified, {} error(s)",
        session.id(),
        final_state,
        report.removed.len(),
        notified,
        report.errors.len()
    );
    session.cleanup.store(report);
    session.set_state(final_state);
    true
}

use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::session::{ScanSession, SessionSettings};
use super::types::{
    EndReason, ScanKind, ScanRequest, ScanTarget, SessionState, SessionSummary, StopOutcome,
};
use crate::error_handling::types::SessionError;

type Slots = Arc<Mutex<HashMap<ScanKind, Arc<ScanSession>>>>;

/// Process-wide table holding at most one session per [`ScanKind`].
///
/// Every operation runs under the same lock, so a replacement is ordered:
/// the previous session has finished its cleanup before the next capture
/// process is spawned. Sessions that end on their own free their slot.
#[derive(Clone)]
pub struct SessionRegistry {
    slots: Slots,
    settings: Arc<SessionSettings>,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Starts a session of `kind`, stopping any session already in the slot.
    ///
    /// Parameters are validated before anything is stopped or spawned.
    pub async fn acquire(
        &self,
        kind: ScanKind,
        request: &ScanRequest,
    ) -> Result<Arc<ScanSession>, SessionError> {
        let target = request.validate(kind)?;
        let mut slots = self.slots.lock().await;
        self.replace_locked(&mut slots, target).await
    }

    /// Returns the running session of `kind`, starting one when the slot is
    /// empty or holds a session that is already ending.
    pub async fn attach_or_start(
        &self,
        kind: ScanKind,
        request: &ScanRequest,
    ) -> Result<Arc<ScanSession>, SessionError> {
        let mut slots = self.slots.lock().await;
        if let Some(session) = slots.get(&kind) {
            if session.state() == SessionState::Running {
                debug!("[{}] Attaching to running {} session", session.id(), kind);
                return Ok(Arc::clone(session));
            }
        }
        let target = request.validate(kind)?;
        self.replace_locked(&mut slots, target).await
    }

    async fn replace_locked(
        &self,
        slots: &mut HashMap<ScanKind, Arc<ScanSession>>,
        target: ScanTarget,
    ) -> Result<Arc<ScanSession>, SessionError> {
        let kind = target.kind();
        if let Some(previous) = slots.remove(&kind) {
            info!("[{}] Replacing active {} session", previous.id(), kind);
            previous.stop(EndReason::Replaced).await;
        }

        let session = ScanSession::start(target, Arc::clone(&self.settings)).await?;
        slots.insert(kind, Arc::clone(&session));
        self.release_on_end(&session);
        Ok(session)
    }

    pub async fn lookup(&self, kind: ScanKind) -> Option<Arc<ScanSession>> {
        self.slots.lock().await.get(&kind).cloned()
    }

    /// Frees the slot only if it still holds session `id`.
    pub async fn release(&self, kind: ScanKind, id: Uuid) -> bool {
        release_slot(&self.slots, kind, id).await
    }

    /// Stops the session of `kind` and waits for its cleanup.
    pub async fn stop(&self, kind: ScanKind) -> StopOutcome {
        let mut slots = self.slots.lock().await;
        match slots.remove(&kind) {
            Some(session) => {
                let state = session.stop(EndReason::StopRequested).await;
                info!("[{}] Stopped on request ({:?})", session.id(), state);
                StopOutcome::Stopped(session.id())
            }
            None => {
                debug!("No active {} session to stop", kind);
                StopOutcome::NoActiveScan
            }
        }
    }

    /// Stops every session. Used on process shutdown.
    pub async fn shutdown_all(&self) -> usize {
        let mut slots = self.slots.lock().await;
        let sessions: Vec<_> = slots.drain().map(|(_, s)| s).collect();
        info!("Shutting down {} active session(s)", sessions.len());
        for session in &sessions {
            session.stop(EndReason::Shutdown).await;
        }
        sessions.len()
    }

    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let slots = self.slots.lock().await;
        let mut summaries: Vec<_> = slots.values().map(|s| s.summary()).collect();
        summaries.sort_by_key(|s| s.started_at);
        summaries
    }

    pub async fn active_count(&self) -> usize {
        self.slots.lock().await.len()
    }

    fn release_on_end(&self, session: &Arc<ScanSession>) {
        let slots = Arc::clone(&self.slots);
        let kind = session.kind();
        let id = session.id();
        let mut state_rx = session.state_receiver();
        tokio::spawn(async move {
            let _ = state_rx.wait_for(|state| state.is_terminal()).await;
            if release_slot(&slots, kind, id).await {
                debug!("[{}] Released {} slot after session end", id, kind);
            }
        });
    }
}

async fn release_slot(slots: &Slots, kind: ScanKind, id: Uuid) -> bool {
    let mut slots = slots.lock().await;
    match slots.get(&kind) {
        Some(current) if current.id() == id => {
            slots.remove(&kind);
            true
        }
        _ => false,
    }
}

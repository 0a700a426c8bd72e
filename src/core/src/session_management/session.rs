use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::cleanup::{self, CleanupCoordinator};
use super::consumer;
use super::record_store::{RecordSet, StationWindow};
use super::subscription::Subscription;
use super::types::{EndReason, ScanEvent, ScanKind, ScanTarget, SessionState, SessionSummary};
use crate::capture_process::{
    ArtifactSet, CaptureProcess, ToolCommand, NETWORK_SUFFIXES, STATION_SUFFIXES,
};
use crate::configuration::{CaptureConfig, Config, ParseMode, SessionPolicy};
use crate::error_handling::types::SessionError;
use crate::parsing::types::{NetworkRecord, StationRecord};

/// Extra time a caller of [`ScanSession::stop`] waits beyond the terminate
/// grace before running cleanup itself.
const STOP_WAIT_MARGIN: Duration = Duration::from_secs(5);

/// Everything a session needs from the configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub capture: CaptureConfig,
    pub policy: SessionPolicy,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            capture: config.capture.clone(),
            policy: config.sessions.clone(),
        }
    }
}

pub(super) struct SharedState {
    pub(super) records: RecordSet,
    pub(super) subscribers: HashMap<u64, mpsc::UnboundedSender<ScanEvent>>,
    next_subscriber: u64,
    pub(super) terminal_event: Option<ScanEvent>,
}

/// One run of the capture tool and everything derived from it.
///
/// # Fields Overview
///
/// - `id`: identifier handed to clients; a new scan always gets a new id
/// - `target`: interface (and BSSID/channel for station discovery)
/// - `process`: the capture tool, owned exclusively by this session
/// - `artifacts`: files the tool writes under the configured work directory
/// - `shared`: live records and subscribers behind one lock, so a merge and
///   its notification are atomic with respect to a new subscription
/// - `state_tx`: lifecycle state, observable by anyone holding the session
/// - `stop_tx`: first stop reason wins; the consumer loop watches it
/// - `cleanup`: one-shot teardown guard
pub struct ScanSession {
    id: Uuid,
    target: ScanTarget,
    started_at: DateTime<Utc>,
    settings: Arc<SessionSettings>,
    process: CaptureProcess,
    artifacts: ArtifactSet,
    shared: Mutex<SharedState>,
    state_tx: watch::Sender<SessionState>,
    stop_tx: watch::Sender<Option<EndReason>>,
    pub(super) cleanup: CleanupCoordinator,
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("state", &self.state())
            .field("process", &self.process)
            .finish()
    }
}

impl ScanSession {
    /// Spawns the capture tool for `target` and starts consuming its output.
    ///
    /// Returns only once the tool has survived the startup grace window. A
    /// tool that cannot be spawned or dies inside the window yields
    /// [`SessionError::Spawn`] and leaves nothing behind.
    pub async fn start(
        target: ScanTarget,
        settings: Arc<SessionSettings>,
    ) -> Result<Arc<Self>, SessionError> {
        let kind = target.kind();
        let artifacts = match kind {
            ScanKind::NetworkDiscovery => {
                ArtifactSet::new_in(&settings.capture.work_dir, "airodump", NETWORK_SUFFIXES)
            }
            ScanKind::StationDiscovery => ArtifactSet::new_in(
                &settings.capture.work_dir,
                "airodump_devices",
                STATION_SUFFIXES,
            ),
        };
        let command = capture_command(&target, &artifacts, &settings);
        let process = CaptureProcess::start(&command)?;

        let (state_tx, _) = watch::channel(SessionState::Starting);
        let (stop_tx, stop_rx) = watch::channel(None);
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            shared: Mutex::new(SharedState {
                records: RecordSet::for_kind(kind),
                subscribers: HashMap::new(),
                next_subscriber: 0,
                terminal_event: None,
            }),
            target,
            settings,
            process,
            artifacts,
            state_tx,
            stop_tx,
            cleanup: CleanupCoordinator::new(),
        });
        info!(
            "[{}] Starting {} on {}",
            session.id,
            kind,
            session.target.interface()
        );

        if let Err(e) = session
            .process
            .wait_ready(session.settings.capture.startup_grace())
            .await
        {
            let status = e.to_string();
            cleanup::run(&session, EndReason::ProcessExited { status }).await;
            return Err(SessionError::Spawn(e));
        }

        // Taken only now so a failed startup can still report its stderr.
        let output = session.process.take_output();
        session.state_tx.send_replace(SessionState::Running);
        tokio::spawn(consumer::run(Arc::clone(&session), output, stop_rx));
        info!("[{}] Running", session.id);
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ScanKind {
        self.target.kind()
    }

    pub fn target(&self) -> &ScanTarget {
        &self.target
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    pub fn state_receiver(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn process(&self) -> &CaptureProcess {
        &self.process
    }

    pub(super) fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// How the consumer loop reads tool output for this session.
    pub fn parse_mode(&self) -> ParseMode {
        match self.kind() {
            ScanKind::NetworkDiscovery => self.settings.capture.network_parse_mode,
            ScanKind::StationDiscovery => ParseMode::Csv,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        match self.kind() {
            ScanKind::NetworkDiscovery => self.settings.capture.network_poll_interval(),
            ScanKind::StationDiscovery => self.settings.capture.station_poll_interval(),
        }
    }

    pub(super) fn shared(&self) -> MutexGuard<'_, SharedState> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(super) fn set_state(&self, state: SessionState) {
        self.state_tx.send_if_modified(|current| {
            if current.is_terminal() || *current == state {
                false
            } else {
                debug!("[{}] {:?} -> {:?}", self.id, current, state);
                *current = state;
                true
            }
        });
    }

    /// Registers a consumer. It first receives the current records, then
    /// every later change; a session that already ended yields only its
    /// terminal event.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut shared = self.shared();
        let id = shared.next_subscriber;
        shared.next_subscriber += 1;

        if let Some(event) = &shared.terminal_event {
            let _ = tx.send(event.clone());
            return Subscription::new(id, self.id, rx, Arc::downgrade(self));
        }

        for event in shared.records.snapshot_events() {
            let _ = tx.send(event);
        }
        shared.subscribers.insert(id, tx);
        debug!(
            "[{}] Subscriber {} added ({} active)",
            self.id,
            id,
            shared.subscribers.len()
        );
        Subscription::new(id, self.id, rx, Arc::downgrade(self))
    }

    pub(super) fn unsubscribe(&self, subscriber: u64) {
        let remaining = {
            let mut shared = self.shared();
            if shared.subscribers.remove(&subscriber).is_none() {
                return;
            }
            shared.subscribers.len()
        };
        debug!(
            "[{}] Subscriber {} removed ({} remaining)",
            self.id, subscriber, remaining
        );
        if remaining == 0 && self.settings.policy.stop_on_last_unsubscribe {
            self.request_stop(EndReason::LastConsumerGone);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared().subscribers.len()
    }

    pub fn record_count(&self) -> usize {
        self.shared().records.len()
    }

    /// Current network table, in first-seen order.
    pub fn networks(&self) -> Vec<NetworkRecord> {
        self.shared().records.networks()
    }

    pub fn station_window(&self) -> Option<StationWindow> {
        self.shared().records.station_window().cloned()
    }

    pub(super) fn ingest_network(&self, record: NetworkRecord) {
        let mut guard = self.shared();
        let shared = &mut *guard;
        if shared.terminal_event.is_some() {
            return;
        }
        if let RecordSet::Networks(table) = &mut shared.records {
            if table.merge(record.clone()).is_change() {
                broadcast(&mut shared.subscribers, ScanEvent::Network { data: record });
            }
        }
    }

    pub(super) fn ingest_station(&self, station: StationRecord) {
        let mut guard = self.shared();
        let shared = &mut *guard;
        if shared.terminal_event.is_some() {
            return;
        }
        if let RecordSet::Stations(window) = &mut shared.records {
            if window.observe(station) {
                let data = window.clone();
                broadcast(&mut shared.subscribers, ScanEvent::Devices { data });
            }
        }
    }

    /// Asks the consumer loop to end the session. Only the first reason is
    /// kept. Returns whether this call was the first.
    pub fn request_stop(&self, reason: EndReason) -> bool {
        let accepted = self.stop_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason.clone());
                true
            } else {
                false
            }
        });
        if accepted {
            info!("[{}] Stop requested: {}", self.id, reason);
        }
        accepted
    }

    /// Stops the session and waits until cleanup has finished.
    pub async fn stop(&self, reason: EndReason) -> SessionState {
        self.request_stop(reason.clone());
        let limit = self.settings.capture.terminate_grace() + STOP_WAIT_MARGIN;
        match tokio::time::timeout(limit, self.wait_terminal()).await {
            Ok(state) => state,
            Err(_) => {
                warn!(
                    "[{}] Consumer did not finish within {:?}, cleaning up directly",
                    self.id, limit
                );
                cleanup::run(self, reason).await;
                self.state()
            }
        }
    }

    /// Resolves once the session reached `Stopped` or `Failed`.
    pub async fn wait_terminal(&self) -> SessionState {
        let mut rx = self.state_tx.subscribe();
        let result = rx.wait_for(|state| state.is_terminal()).await.map(|s| *s);
        result.unwrap_or(SessionState::Failed)
    }

    pub fn summary(&self) -> SessionSummary {
        let shared = self.shared();
        SessionSummary {
            id: self.id,
            kind: self.kind(),
            state: self.state(),
            interface: self.target.interface().to_string(),
            record_count: shared.records.len(),
            subscriber_count: shared.subscribers.len(),
            started_at: self.started_at,
        }
    }

    /// Number of times teardown actually ran (never more than one).
    pub fn cleanup_runs(&self) -> usize {
        self.cleanup.runs()
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if self.cleanup.has_run() {
            return;
        }
        warn!(
            "[{}] Session dropped without cleanup, tearing down synchronously",
            self.id
        );
        if let Err(e) = self.process.terminate() {
            warn!("[{}] {}", self.id, e);
        }
        let (_, errors) = self.artifacts.remove_all();
        for e in errors {
            warn!("[{}] {}", self.id, e);
        }
    }
}

fn broadcast(subscribers: &mut HashMap<u64, mpsc::UnboundedSender<ScanEvent>>, event: ScanEvent) {
    subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
}

/// Command line of the capture tool for `target`.
pub fn capture_command(
    target: &ScanTarget,
    artifacts: &ArtifactSet,
    settings: &SessionSettings,
) -> ToolCommand {
    let capture = &settings.capture;
    let prefix = artifacts.prefix_arg();
    let command = ToolCommand::new(capture.airodump_path.as_str(), capture.use_sudo)
        .working_dir(&capture.work_dir);

    match target {
        ScanTarget::Networks { interface } => match capture.network_parse_mode {
            ParseMode::Csv => command
                .args(["--write", prefix.as_str(), "--output-format", "csv"])
                .arg(interface.as_str()),
            ParseMode::FreeText => command.arg(interface.as_str()),
        },
        ScanTarget::Stations {
            interface,
            bssid,
            channel,
        } => command
            .arg(interface.as_str())
            .args(["--bssid", bssid.as_str()])
            .arg("--channel")
            .arg(channel.to_string())
            .args(["-w", prefix.as_str()]),
    }
}

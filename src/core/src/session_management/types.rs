use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::record_store::StationWindow;
use crate::error_handling::types::SessionError;
use crate::parsing::types::{canonical_mac, is_mac_address, NetworkRecord};
use crate::wireless::is_valid_interface_name;

/// The two independent scan slots of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    NetworkDiscovery,
    StationDiscovery,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanKind::NetworkDiscovery => write!(f, "network discovery"),
            ScanKind::StationDiscovery => write!(f, "station discovery"),
        }
    }
}

/// Lifecycle of a scan session. States are never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed)
    }
}

/// Why a session left `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndReason {
    StopRequested,
    LastConsumerGone,
    ProcessExited { status: String },
    Shutdown,
    Replaced,
}

impl EndReason {
    /// Ends caused by the capture tool rather than by a caller.
    pub fn is_failure(&self) -> bool {
        matches!(self, EndReason::ProcessExited { .. })
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::StopRequested => write!(f, "stop requested"),
            EndReason::LastConsumerGone => write!(f, "last consumer disconnected"),
            EndReason::ProcessExited { status } => {
                write!(f, "capture process exited unexpectedly ({})", status)
            }
            EndReason::Shutdown => write!(f, "server shutting down"),
            EndReason::Replaced => write!(f, "replaced by a new scan"),
        }
    }
}

/// Payload pushed to subscribers. Serialized as
/// `{"type": "...", ...}` for the event stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Network { data: NetworkRecord },
    Devices { data: StationWindow },
    Error { message: String },
    End { reason: String },
}

impl ScanEvent {
    /// Terminal events are the last thing a subscriber ever receives.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanEvent::Error { .. } | ScanEvent::End { .. })
    }
}

/// A validated scan target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanTarget {
    Networks {
        interface: String,
    },
    Stations {
        interface: String,
        bssid: String,
        channel: u16,
    },
}

impl ScanTarget {
    pub fn kind(&self) -> ScanKind {
        match self {
            ScanTarget::Networks { .. } => ScanKind::NetworkDiscovery,
            ScanTarget::Stations { .. } => ScanKind::StationDiscovery,
        }
    }

    pub fn interface(&self) -> &str {
        match self {
            ScanTarget::Networks { interface } | ScanTarget::Stations { interface, .. } => interface,
        }
    }
}

/// Unvalidated scan parameters as they arrive from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    pub interface: Option<String>,
    pub bssid: Option<String>,
    pub channel: Option<String>,
}

impl ScanRequest {
    pub fn networks(interface: Option<String>) -> Self {
        Self {
            interface,
            ..Default::default()
        }
    }

    pub fn stations(interface: Option<String>, bssid: Option<String>, channel: Option<String>) -> Self {
        Self {
            interface,
            bssid,
            channel,
        }
    }

    /// Checks every parameter `kind` needs. Nothing is spawned for a request
    /// that fails here.
    pub fn validate(&self, kind: ScanKind) -> Result<ScanTarget, SessionError> {
        let interface = required(&self.interface, "Interface")?;
        if !is_valid_interface_name(interface) {
            return Err(SessionError::InvalidParameter(format!(
                "'{}' is not a valid interface name",
                interface
            )));
        }
        let interface = interface.to_string();

        match kind {
            ScanKind::NetworkDiscovery => Ok(ScanTarget::Networks { interface }),
            ScanKind::StationDiscovery => {
                let bssid = required(&self.bssid, "BSSID")?;
                if !is_mac_address(bssid) {
                    return Err(SessionError::InvalidParameter(format!(
                        "'{}' is not a valid BSSID",
                        bssid
                    )));
                }
                let channel = required(&self.channel, "Channel")?;
                let channel = match channel.parse::<u16>() {
                    Ok(c) if c > 0 => c,
                    _ => {
                        return Err(SessionError::InvalidParameter(format!(
                            "'{}' is not a valid channel",
                            channel
                        )))
                    }
                };
                Ok(ScanTarget::Stations {
                    interface,
                    bssid: canonical_mac(bssid),
                    channel,
                })
            }
        }
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, SessionError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SessionError::MissingParameter(name)),
    }
}

/// Point-in-time view of a session for the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub kind: ScanKind,
    pub state: SessionState,
    pub interface: String,
    pub record_count: usize,
    pub subscriber_count: usize,
    pub started_at: DateTime<Utc>,
}

/// Result of stopping a registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped(Uuid),
    NoActiveScan,
}

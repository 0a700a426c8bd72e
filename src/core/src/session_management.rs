//! Scan session orchestration.
//!
//! A [`ScanSession`] owns one capture process and a background loop that
//! parses its output into a live record set and pushes every change to its
//! [`Subscription`]s. The [`SessionRegistry`] keeps at most one session per
//! [`ScanKind`] and replaces them in order. Whatever ends a session (explicit
//! stop, last consumer gone, tool exit, replacement, shutdown), the teardown
//! in [`cleanup`] runs exactly once.
//!
//! Example (non-running):
//! ```ignore
//! use airsight::session_management::{ScanKind, ScanRequest, SessionRegistry, SessionSettings};
//!
//! let registry = SessionRegistry::new(SessionSettings::default());
//! let session = registry
//!     .acquire(ScanKind::NetworkDiscovery, &ScanRequest::networks(Some("wlan0mon".into())))
//!     .await?;
//! let mut events = session.subscribe();
//! while let Some(event) = events.recv().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cleanup;
mod consumer;
#[cfg(test)]
pub(crate) mod fake_capture;
#[cfg(test)]
pub mod integration_tests;
pub mod record_store;
pub mod session;
pub mod session_registry;
pub mod subscription;
pub mod types;

pub use cleanup::{CleanupCoordinator, CleanupReport};
pub use record_store::{MergeOutcome, NetworkTable, RecordSet, StationWindow};
pub use session::{capture_command, ScanSession, SessionSettings};
pub use session_registry::SessionRegistry;
pub use subscription::Subscription;
pub use types::{
    EndReason, ScanEvent, ScanKind, ScanRequest, ScanTarget, SessionState, SessionSummary,
    StopOutcome,
};

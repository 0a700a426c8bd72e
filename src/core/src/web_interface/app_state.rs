use std::sync::Arc;

use crate::configuration::Config;
use crate::session_management::{SessionRegistry, SessionSettings};
use crate::wireless::{AirmonToggler, InterfaceInventory, IpLinkInventory, MonitorManager};

/// Shared state handed to every route.
///
/// # Fields Overview
///
/// - `registry`: the scan sessions, at most one per kind
/// - `monitor`: monitor-mode switching and the current monitor interface
/// - `inventory`: source of `/list-devices`
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub monitor: Arc<MonitorManager>,
    pub inventory: Arc<dyn InterfaceInventory>,
}

impl AppState {
    pub fn new(
        registry: SessionRegistry,
        monitor: Arc<MonitorManager>,
        inventory: Arc<dyn InterfaceInventory>,
    ) -> Self {
        Self {
            registry,
            monitor,
            inventory,
        }
    }

    /// Wires the real `airodump-ng`/`airmon-ng`/`ip` backed collaborators.
    pub fn from_config(config: &Config) -> Self {
        let registry = SessionRegistry::new(SessionSettings::from_config(config));
        let monitor = MonitorManager::new(Arc::new(AirmonToggler::from_config(&config.capture)));
        let inventory = IpLinkInventory::new(config.capture.ip_path.as_str());
        Self::new(registry, Arc::new(monitor), Arc::new(inventory))
    }
}

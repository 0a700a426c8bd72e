use log::{debug, info};

use super::app_state::AppState;
use super::types::{
    ApiFailure, DevicesQuery, DevicesResponse, InterfaceRequest, MessageResponse,
    NetworksResponse, ScansResponse, StartScanResponse,
};
use crate::session_management::{ScanKind, ScanRequest, StopOutcome, Subscription};
use crate::wireless::MonitorOutcome;

/// GET /list-devices
pub async fn list_devices(state: &AppState) -> Result<DevicesResponse, ApiFailure> {
    let devices = state.inventory.list_interfaces().await?;
    Ok(DevicesResponse { devices })
}

/// POST /start-monitor
pub async fn start_monitor(
    state: &AppState,
    body: &InterfaceRequest,
) -> Result<MonitorOutcome, ApiFailure> {
    Ok(state.monitor.enable(body.interface.as_deref()).await?)
}

/// POST /stop-monitor
pub async fn stop_monitor(
    state: &AppState,
    body: &InterfaceRequest,
) -> Result<MonitorOutcome, ApiFailure> {
    Ok(state.monitor.disable(body.interface.as_deref()).await?)
}

/// POST /start-scan. Without an interface in the body the current monitor
/// interface is used.
pub async fn start_scan(
    state: &AppState,
    body: &InterfaceRequest,
) -> Result<StartScanResponse, ApiFailure> {
    let interface = match &body.interface {
        Some(interface) => Some(interface.clone()),
        None => state.monitor.current().await,
    };
    let session = state
        .registry
        .acquire(ScanKind::NetworkDiscovery, &ScanRequest::networks(interface))
        .await?;
    info!("[{}] Network scan started", session.id());
    Ok(StartScanResponse {
        message: "Scan started successfully".to_string(),
        session_id: session.id(),
    })
}

/// POST /stop-scan
pub async fn stop_scan(state: &AppState) -> MessageResponse {
    match state.registry.stop(ScanKind::NetworkDiscovery).await {
        StopOutcome::Stopped(_) => MessageResponse::new("Scan stopped successfully"),
        StopOutcome::NoActiveScan => MessageResponse::new("No active scan to stop"),
    }
}

/// POST /stop-devices-scan
pub async fn stop_devices_scan(state: &AppState) -> MessageResponse {
    match state.registry.stop(ScanKind::StationDiscovery).await {
        StopOutcome::Stopped(_) => MessageResponse::new("Device scan stopped successfully"),
        StopOutcome::NoActiveScan => MessageResponse::new("No active device scan to stop"),
    }
}

/// GET /networks: snapshot of the running network scan, empty without one.
pub async fn networks(state: &AppState) -> NetworksResponse {
    let networks = match state.registry.lookup(ScanKind::NetworkDiscovery).await {
        Some(session) => session.networks(),
        None => Vec::new(),
    };
    NetworksResponse { networks }
}

/// GET /scans
pub async fn scans(state: &AppState) -> ScansResponse {
    ScansResponse {
        scans: state.registry.summaries().await,
    }
}

/// GET /get-networks: attaches to the running network scan, or starts one on
/// the current monitor interface.
pub async fn open_network_stream(state: &AppState) -> Result<Subscription, ApiFailure> {
    let request = ScanRequest::networks(state.monitor.current().await);
    let session = state
        .registry
        .attach_or_start(ScanKind::NetworkDiscovery, &request)
        .await?;
    let subscription = session.subscribe();
    debug!("[{}] Network stream opened", session.id());
    Ok(subscription)
}

/// GET /get-devices-in-network: always starts a fresh station scan for the
/// requested network, replacing any previous one.
pub async fn open_device_stream(
    state: &AppState,
    query: &DevicesQuery,
) -> Result<Subscription, ApiFailure> {
    let interface = match &query.interface {
        Some(interface) => Some(interface.clone()),
        None => state.monitor.current().await,
    };
    let request = ScanRequest::stations(interface, query.bssid.clone(), query.channel.clone());
    let session = state
        .registry
        .acquire(ScanKind::StationDiscovery, &request)
        .await?;
    info!(
        "[{}] Station scan started on {}",
        session.id(),
        session.target().interface()
    );
    Ok(session.subscribe())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ParseMode;
    use crate::error_handling::types::WirelessError;
    use crate::session_management::fake_capture::{event_matching, FakeCapture, CSV_FIXTURE};
    use crate::session_management::{ScanEvent, SessionRegistry};
    use crate::wireless::{monitor_name, InterfaceInventory, MonitorManager, MonitorToggler};
    use async_trait::async_trait;
    use serial_test::serial;
    use std::sync::Arc;
    use warp::http::StatusCode;

    struct StaticInventory(Vec<&'static str>);

    #[async_trait]
    impl InterfaceInventory for StaticInventory {
        async fn list_interfaces(&self) -> Result<Vec<String>, WirelessError> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    struct InstantToggler;

    #[async_trait]
    impl MonitorToggler for InstantToggler {
        async fn enable(&self, base: &str) -> Result<MonitorOutcome, WirelessError> {
            Ok(MonitorOutcome {
                output: format!("monitor mode enabled for {}", base),
                monitor_interface: monitor_name(base),
            })
        }

        async fn disable(&self, base: &str) -> Result<MonitorOutcome, WirelessError> {
            Ok(MonitorOutcome {
                output: format!("monitor mode disabled for {}", base),
                monitor_interface: monitor_name(base),
            })
        }
    }

    fn state_for(fake: &FakeCapture) -> AppState {
        AppState::new(
            SessionRegistry::new(fake.settings(ParseMode::Csv)),
            Arc::new(MonitorManager::new(Arc::new(InstantToggler))),
            Arc::new(StaticInventory(vec!["eth0", "wlan0"])),
        )
    }

    fn interface(name: &str) -> InterfaceRequest {
        InterfaceRequest {
            interface: Some(name.to_string()),
        }
    }

    #[tokio::test]
    async fn test_list_devices() {
        let fake = FakeCapture::with_body("exec sleep 30");
        let state = state_for(&fake);
        let response = list_devices(&state).await.unwrap();
        assert_eq!(response.devices, vec!["eth0", "wlan0"]);
    }

    #[tokio::test]
    async fn test_monitor_round_trip() {
        let fake = FakeCapture::with_body("exec sleep 30");
        let state = state_for(&fake);

        let err = start_monitor(&state, &InterfaceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Interface parameter missing");

        let outcome = start_monitor(&state, &interface("wlan0")).await.unwrap();
        assert_eq!(outcome.monitor_interface, "wlan0mon");
        assert_eq!(state.monitor.current().await.as_deref(), Some("wlan0mon"));

        stop_monitor(&state, &interface("wlan0")).await.unwrap();
        assert_eq!(state.monitor.current().await, None);
    }

    #[tokio::test]
    async fn test_scan_without_interface_is_rejected() {
        let fake = FakeCapture::with_body("exec sleep 30");
        let state = state_for(&fake);

        let err = start_scan(&state, &InterfaceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(open_network_stream(&state).await.is_err());
        assert_eq!(state.registry.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_stop_messages_without_scans() {
        let fake = FakeCapture::with_body("exec sleep 30");
        let state = state_for(&fake);
        assert_eq!(stop_scan(&state).await.message, "No active scan to stop");
        assert_eq!(
            stop_devices_scan(&state).await.message,
            "No active device scan to stop"
        );
        assert!(networks(&state).await.networks.is_empty());
        assert!(scans(&state).await.scans.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_scan_uses_current_monitor_interface() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let state = state_for(&fake);
        start_monitor(&state, &interface("wlan0")).await.unwrap();

        let started = start_scan(&state, &InterfaceRequest::default())
            .await
            .unwrap();
        assert_eq!(started.message, "Scan started successfully");

        let summaries = scans(&state).await.scans;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, started.session_id);
        assert_eq!(summaries[0].interface, "wlan0mon");

        // The stream attaches to the scan started above.
        let mut stream = open_network_stream(&state).await.unwrap();
        assert_eq!(stream.session_id(), started.session_id);
        event_matching(&mut stream, |e| matches!(e, ScanEvent::Network { .. })).await;
        assert!(!networks(&state).await.networks.is_empty());

        assert_eq!(stop_scan(&state).await.message, "Scan stopped successfully");
        let end = event_matching(&mut stream, ScanEvent::is_terminal).await;
        assert_eq!(
            end,
            ScanEvent::End {
                reason: "stop requested".to_string()
            }
        );
        assert!(fake.leftover_files().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_device_stream() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let state = state_for(&fake);

        let missing = DevicesQuery {
            bssid: None,
            channel: Some("6".to_string()),
            interface: Some("wlan0mon".to_string()),
        };
        let err = open_device_stream(&state, &missing).await.unwrap_err();
        assert_eq!(err.message, "BSSID parameter missing");

        let query = DevicesQuery {
            bssid: Some("aa:bb:cc:dd:ee:ff".to_string()),
            channel: Some("6".to_string()),
            interface: Some("wlan0mon".to_string()),
        };
        let mut stream = open_device_stream(&state, &query).await.unwrap();
        let devices = event_matching(&mut stream, |e| match e {
            ScanEvent::Devices { data } => data.len() == 2,
            _ => false,
        })
        .await;
        let ScanEvent::Devices { data } = devices else {
            panic!("expected a devices event");
        };
        assert_eq!(
            data.first_device.map(|d| d.mac).as_deref(),
            Some("AA:11:22:33:44:55")
        );

        assert_eq!(
            stop_devices_scan(&state).await.message,
            "Device scan stopped successfully"
        );
        event_matching(&mut stream, ScanEvent::is_terminal).await;
        assert!(fake.leftover_files().is_empty());
    }
}

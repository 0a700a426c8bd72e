use log::{info, warn};
use std::net::SocketAddr;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use crate::configuration::config::Config;
use crate::error_handling::types::*;
use crate::web_interface::{bind_address, AppState, WebServer};

/// Owns the application state for the lifetime of the process: serves the
/// API and tears every session down on SIGINT/SIGTERM.
pub struct Controller {
    pub config: Config,
    state: AppState,
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        let state = AppState::from_config(&config);
        Self::with_state(config, state)
    }

    /// Uses caller-supplied collaborators instead of the real tools.
    pub fn with_state(config: Config, state: AppState) -> Result<Self, ControllerError> {
        let addr = bind_address(&config.server)?;
        std::fs::create_dir_all(&config.capture.work_dir).map_err(|e| {
            ControllerError::InitializationFailed(format!(
                "work directory {}: {}",
                config.capture.work_dir.display(),
                e
            ))
        })?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            config,
            state,
            addr,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Sender that stops [`Controller::run`] when set to `true`.
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    pub async fn run(&mut self) -> Result<(), ControllerError> {
        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            ControllerError::InitializationFailed(format!("SIGTERM handler: {}", e))
        })?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
            ControllerError::InitializationFailed(format!("SIGINT handler: {}", e))
        })?;

        // Sessions are stopped while the server still runs, so open event
        // streams get their `end` event before the listener goes away.
        let (server_stop_tx, mut server_stop_rx) = watch::channel(false);
        let server = WebServer::new(self.state.clone(), self.config.server.allowed_origins.clone());
        let serve = server.start(self.addr, async move {
            let _ = server_stop_rx.wait_for(|stop| *stop).await;
        });
        tokio::pin!(serve);

        let mut shutdown_rx = self.shutdown_rx.clone();
        loop {
            tokio::select! {
                result = &mut serve => {
                    warn!("HTTP API stopped on its own");
                    self.shutdown().await;
                    return result.map_err(ControllerError::from);
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    break;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown requested");
                        break;
                    }
                }
            }
        }

        let _ = self.shutdown_tx.send(true);
        self.shutdown().await;
        let _ = server_stop_tx.send(true);
        serve.await.map_err(ControllerError::from)
    }

    /// Stops every scan session and leaves monitor mode if this process
    /// enabled it.
    pub async fn shutdown(&self) {
        let stopped = self.state.registry.shutdown_all().await;
        info!("Stopped {} scan session(s)", stopped);
        match self.state.monitor.disable_current().await {
            Some(Ok(outcome)) => info!("Disabled {}", outcome.monitor_interface),
            Some(Err(e)) => warn!("Could not disable monitor mode: {}", e),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ParseMode;
    use crate::session_management::fake_capture::{FakeCapture, CSV_FIXTURE};
    use crate::session_management::{ScanEvent, ScanKind, ScanRequest, SessionRegistry};
    use crate::wireless::{IpLinkInventory, MonitorManager, MonitorOutcome, MonitorToggler};
    use async_trait::async_trait;
    use serial_test::serial;
    use std::sync::Arc;
    use std::time::Duration;

    struct NoopToggler;

    #[async_trait]
    impl MonitorToggler for NoopToggler {
        async fn enable(&self, base: &str) -> Result<MonitorOutcome, WirelessError> {
            Ok(MonitorOutcome {
                output: String::new(),
                monitor_interface: format!("{}mon", base),
            })
        }

        async fn disable(&self, base: &str) -> Result<MonitorOutcome, WirelessError> {
            self.enable(base).await
        }
    }

    fn config_with_port(port: u16) -> Config {
        let mut config = Config::default();
        config.server.port = port;
        config.capture.use_sudo = false;
        config
    }

    #[test]
    fn test_new_rejects_bad_bind_address() {
        let mut config = config_with_port(0);
        config.server.bind_address = "not an address".to_string();
        assert!(matches!(
            Controller::new(config),
            Err(ControllerError::WebError(WebError::InvalidBindAddress(_)))
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_shutdown_stops_sessions_and_monitor() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let state = AppState::new(
            SessionRegistry::new(fake.settings(ParseMode::Csv)),
            Arc::new(MonitorManager::new(Arc::new(NoopToggler))),
            Arc::new(IpLinkInventory::new("ip")),
        );
        let mut controller = Controller::with_state(config_with_port(0), state.clone()).unwrap();

        state.monitor.enable(Some("wlan0")).await.unwrap();
        let session = state
            .registry
            .acquire(
                ScanKind::NetworkDiscovery,
                &ScanRequest::networks(Some("wlan0mon".to_string())),
            )
            .await
            .unwrap();

        let handle = controller.shutdown_handle();
        let run = tokio::spawn(async move { controller.run().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("controller did not stop")
            .unwrap()
            .unwrap();
        assert!(session.state().is_terminal());
        assert_eq!(state.registry.active_count().await, 0);
        assert_eq!(state.monitor.current().await, None);
        assert!(fake.leftover_files().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_subscribers_see_end_before_server_stops() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let state = AppState::new(
            SessionRegistry::new(fake.settings(ParseMode::Csv)),
            Arc::new(MonitorManager::new(Arc::new(NoopToggler))),
            Arc::new(IpLinkInventory::new("ip")),
        );
        let mut controller = Controller::with_state(config_with_port(0), state.clone()).unwrap();

        let session = state
            .registry
            .attach_or_start(
                ScanKind::NetworkDiscovery,
                &ScanRequest::networks(Some("wlan0mon".to_string())),
            )
            .await
            .unwrap();
        let mut sub = session.subscribe();

        let handle = controller.shutdown_handle();
        let run = tokio::spawn(async move { controller.run().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("controller did not stop")
            .unwrap()
            .unwrap();

        let mut last = None;
        while let Some(event) = sub.try_recv() {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(ScanEvent::End {
                reason: "server shutting down".to_string()
            })
        );
    }
}

#[cfg(test)]
mod integration_tests {
    use crate::configuration::ParseMode;
    use crate::error_handling::types::SessionError;
    use crate::session_management::fake_capture::{
        event_matching, FakeCapture, CSV_FIXTURE,
    };
    use crate::session_management::{
        ScanEvent, ScanKind, ScanRequest, SessionRegistry, SessionSettings, SessionState,
        StopOutcome,
    };
    use serial_test::serial;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn registry_for(fake: &FakeCapture) -> SessionRegistry {
        SessionRegistry::new(fake.settings(ParseMode::Csv))
    }

    fn network_request() -> ScanRequest {
        ScanRequest::networks(Some("wlan0mon".to_string()))
    }

    fn station_request() -> ScanRequest {
        ScanRequest::stations(
            Some("wlan0mon".to_string()),
            Some("AA:BB:CC:DD:EE:FF".to_string()),
            Some("6".to_string()),
        )
    }

    async fn wait_until_released(registry: &SessionRegistry, kind: ScanKind) {
        timeout(Duration::from_secs(5), async {
            while registry.lookup(kind).await.is_some() {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("slot was not released");
    }

    #[tokio::test]
    #[serial]
    async fn test_second_acquire_replaces_first() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let registry = registry_for(&fake);

        let first = registry
            .acquire(ScanKind::NetworkDiscovery, &network_request())
            .await
            .expect("first scan");
        let mut first_events = first.subscribe();
        let second = registry
            .acquire(ScanKind::NetworkDiscovery, &network_request())
            .await
            .expect("second scan");

        assert_ne!(first.id(), second.id());
        assert_eq!(first.state(), SessionState::Stopped);
        assert_eq!(first.cleanup_runs(), 1);
        assert!(!first.artifacts().csv_path().exists());
        assert_eq!(second.state(), SessionState::Running);

        let end = event_matching(&mut first_events, ScanEvent::is_terminal).await;
        assert_eq!(
            end,
            ScanEvent::End {
                reason: "replaced by a new scan".to_string()
            }
        );

        assert_eq!(registry.active_count().await, 1);
        assert_eq!(
            registry.lookup(ScanKind::NetworkDiscovery).await.map(|s| s.id()),
            Some(second.id())
        );

        assert_eq!(
            registry.stop(ScanKind::NetworkDiscovery).await,
            StopOutcome::Stopped(second.id())
        );
        assert_eq!(first.cleanup_runs(), 1);
        assert_eq!(second.cleanup_runs(), 1);
        assert!(fake.leftover_files().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_kinds_have_independent_slots() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let registry = registry_for(&fake);

        let networks = registry
            .acquire(ScanKind::NetworkDiscovery, &network_request())
            .await
            .expect("network scan");
        let stations = registry
            .acquire(ScanKind::StationDiscovery, &station_request())
            .await
            .expect("station scan");
        assert_eq!(networks.state(), SessionState::Running);
        assert_eq!(stations.state(), SessionState::Running);

        let summaries = registry.summaries().await;
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.interface == "wlan0mon"));

        assert_eq!(registry.shutdown_all().await, 2);
        assert_eq!(registry.active_count().await, 0);
        assert_eq!(networks.state(), SessionState::Stopped);
        assert_eq!(stations.state(), SessionState::Stopped);
        assert!(fake.leftover_files().is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_session_is_not_an_error() {
        let fake = FakeCapture::with_body("exec sleep 30");
        let registry = registry_for(&fake);
        assert_eq!(
            registry.stop(ScanKind::NetworkDiscovery).await,
            StopOutcome::NoActiveScan
        );
        assert_eq!(
            registry.stop(ScanKind::StationDiscovery).await,
            StopOutcome::NoActiveScan
        );
    }

    #[tokio::test]
    async fn test_invalid_request_spawns_nothing() {
        let fake = FakeCapture::with_body("touch \"$prefix-01.csv\"\nexec sleep 30");
        let registry = registry_for(&fake);

        let missing = ScanRequest::stations(Some("wlan0mon".to_string()), None, Some("6".to_string()));
        let err = registry
            .acquire(ScanKind::StationDiscovery, &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::MissingParameter("BSSID")));

        let err = registry
            .acquire(ScanKind::NetworkDiscovery, &ScanRequest::networks(None))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::MissingParameter("Interface")));

        assert_eq!(registry.active_count().await, 0);
        assert!(fake.leftover_files().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_request_keeps_running_session() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let registry = registry_for(&fake);
        let running = registry
            .acquire(ScanKind::StationDiscovery, &station_request())
            .await
            .expect("station scan");

        let bad = ScanRequest::stations(
            Some("wlan0mon".to_string()),
            Some("AA:BB:CC:DD:EE:FF".to_string()),
            Some("x".to_string()),
        );
        assert!(registry.acquire(ScanKind::StationDiscovery, &bad).await.is_err());
        assert_eq!(running.state(), SessionState::Running);

        registry.shutdown_all().await;
    }

    #[tokio::test]
    #[serial]
    async fn test_session_end_releases_slot() {
        let fake = FakeCapture::writing_csv_then_exiting(CSV_FIXTURE, 1);
        let registry = registry_for(&fake);
        let session = registry
            .acquire(ScanKind::NetworkDiscovery, &network_request())
            .await
            .expect("scan");

        wait_until_released(&registry, ScanKind::NetworkDiscovery).await;
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.cleanup_runs(), 1);
        assert_eq!(
            registry.stop(ScanKind::NetworkDiscovery).await,
            StopOutcome::NoActiveScan
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_disconnect_releases_slot() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let registry = registry_for(&fake);
        let session = registry
            .acquire(ScanKind::NetworkDiscovery, &network_request())
            .await
            .expect("scan");

        let stream_consumer = session.subscribe();
        drop(stream_consumer);

        wait_until_released(&registry, ScanKind::NetworkDiscovery).await;
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.cleanup_runs(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_stale_release_is_ignored() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let registry = registry_for(&fake);
        let session = registry
            .acquire(ScanKind::NetworkDiscovery, &network_request())
            .await
            .expect("scan");

        assert!(!registry.release(ScanKind::NetworkDiscovery, uuid::Uuid::new_v4()).await);
        assert!(!registry.release(ScanKind::StationDiscovery, session.id()).await);
        assert_eq!(registry.active_count().await, 1);

        registry.shutdown_all().await;
    }

    #[tokio::test]
    #[serial]
    async fn test_attach_or_start_reuses_running_session() {
        let fake = FakeCapture::writing_csv(CSV_FIXTURE);
        let registry = registry_for(&fake);

        let started = registry
            .attach_or_start(ScanKind::NetworkDiscovery, &network_request())
            .await
            .expect("scan");
        let attached = registry
            .attach_or_start(ScanKind::NetworkDiscovery, &ScanRequest::networks(None))
            .await
            .expect("attach");
        assert_eq!(started.id(), attached.id());
        assert_eq!(started.cleanup_runs(), 0);

        registry.shutdown_all().await;
        assert_eq!(started.cleanup_runs(), 1);
    }

    #[tokio::test]
    #[ignore = "requires airodump-ng, a monitor-mode interface and root privileges"]
    async fn test_real_capture_tool() {
        let Ok(interface) = std::env::var("AIRSIGHT_TEST_MONITOR_INTERFACE") else {
            return;
        };
        let mut settings = SessionSettings::default();
        settings.capture.use_sudo = false;
        let registry = SessionRegistry::new(settings);

        let session = registry
            .acquire(ScanKind::NetworkDiscovery, &ScanRequest::networks(Some(interface)))
            .await
            .expect("Failed to start airodump-ng");
        let mut events = session.subscribe();
        let first = timeout(Duration::from_secs(30), events.recv()).await;
        println!("First event: {:?}", first);

        registry.shutdown_all().await;
        assert!(!session.artifacts().csv_path().exists());
    }
}

use log::{error, info};
use airsight::configuration::Config;
use airsight::session_management::{
    ScanEvent, ScanKind, ScanRequest, SessionRegistry, SessionSettings,
};
use std::time::Duration;

/// Runs a network-discovery scan on a monitor interface for 30 seconds and
/// prints every event. Needs airodump-ng and root:
///
///   sudo cargo run --example scan_session_demo -- wlan0mon
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let interface = std::env::args().nth(1);
    if interface.is_none() {
        error!("Usage: scan_session_demo <monitor interface>");
        std::process::exit(2);
    }

    let mut config = Config::default();
    config.capture.use_sudo = false;
    let registry = SessionRegistry::new(SessionSettings::from_config(&config));

    let session = registry
        .acquire(ScanKind::NetworkDiscovery, &ScanRequest::networks(interface))
        .await?;
    info!("Scan {} started", session.id());

    let mut events = session.subscribe();
    let deadline = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ScanEvent::Network { data }) => {
                    let channel = data.channel.map(|c| c.to_string()).unwrap_or_default();
                    println!(
                        "{:<17}  ch {:>3}  {:>4}  {:<8} {}",
                        data.bssid,
                        channel,
                        data.power.to_string(),
                        data.encryption,
                        data.essid
                    );
                }
                Some(event) if event.is_terminal() => {
                    info!("Scan ended: {:?}", event);
                    break;
                }
                Some(_) => {}
                None => break,
            },
            _ = &mut deadline => break,
        }
    }

    registry.shutdown_all().await;
    info!("Artifacts removed: {}", !session.artifacts().csv_path().exists());
    Ok(())
}

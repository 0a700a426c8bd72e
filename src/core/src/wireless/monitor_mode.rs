use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use std::process::Output;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{is_valid_interface_name, monitor_name, MONITOR_SUFFIX};
use crate::capture_process::ToolCommand;
use crate::configuration::CaptureConfig;
use crate::error_handling::types::WirelessError;

/// Result of a monitor-mode switch, returned to the client as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorOutcome {
    pub output: String,
    pub monitor_interface: String,
}

/// Switches a wireless interface in and out of monitor mode.
#[async_trait]
pub trait MonitorToggler: Send + Sync {
    /// Puts `base` into monitor mode; the monitor interface is `<base>mon`.
    async fn enable(&self, base: &str) -> Result<MonitorOutcome, WirelessError>;
    /// Removes `<base>mon` and brings `base` back up.
    async fn disable(&self, base: &str) -> Result<MonitorOutcome, WirelessError>;
}

/// [`MonitorToggler`] backed by `airmon-ng` and `ip`.
#[derive(Debug, Clone)]
pub struct AirmonToggler {
    airmon_path: String,
    ip_path: String,
    use_sudo: bool,
    kill_interfering: bool,
}

impl AirmonToggler {
    pub fn from_config(capture: &CaptureConfig) -> Self {
        Self {
            airmon_path: capture.airmon_path.clone(),
            ip_path: capture.ip_path.clone(),
            use_sudo: capture.use_sudo,
            kill_interfering: capture.kill_interfering,
        }
    }

    fn airmon(&self) -> ToolCommand {
        ToolCommand::new(self.airmon_path.as_str(), self.use_sudo)
    }

    async fn run(&self, command: ToolCommand) -> Result<Output, WirelessError> {
        command
            .run_to_completion()
            .await
            .map_err(|e| WirelessError::CommandFailed {
                command: command.display(),
                detail: e.to_string(),
            })
    }

    /// Runs `command` and fails unless it exits successfully.
    async fn run_checked(&self, command: ToolCommand) -> Result<String, WirelessError> {
        let display = command.display();
        let output = self.run(command).await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            format!("{} {}", output.status, stdout.trim())
        } else {
            format!("{} {}", output.status, stderr.trim())
        };
        Err(WirelessError::CommandFailed {
            command: display,
            detail: detail.trim().to_string(),
        })
    }

    /// Runs `command`, only logging a failure.
    async fn run_lenient(&self, command: ToolCommand) {
        let display = command.display();
        match self.run_checked(command).await {
            Ok(_) => debug!("{} succeeded", display),
            Err(e) => debug!("{}", e),
        }
    }
}

#[async_trait]
impl MonitorToggler for AirmonToggler {
    async fn enable(&self, base: &str) -> Result<MonitorOutcome, WirelessError> {
        let monitor = monitor_name(base);
        if self.kill_interfering {
            let check = self.airmon().args(["check", "kill"]);
            if let Err(e) = self.run_checked(check).await {
                warn!("Could not stop interfering processes: {}", e);
            }
        }
        // A monitor interface left over from an earlier run makes airmon-ng
        // pick a different name.
        self.run_lenient(self.airmon().args(["stop", monitor.as_str()]))
            .await;

        let output = self.run_checked(self.airmon().args(["start", base])).await?;
        info!("Monitor mode enabled on {} ({})", base, monitor);
        Ok(MonitorOutcome {
            output,
            monitor_interface: monitor,
        })
    }

    async fn disable(&self, base: &str) -> Result<MonitorOutcome, WirelessError> {
        let monitor = monitor_name(base);
        let output = self
            .run_checked(self.airmon().args(["stop", monitor.as_str()]))
            .await?;

        let link_up = ToolCommand::new(self.ip_path.as_str(), self.use_sudo)
            .args(["link", "set", base, "up"]);
        if let Err(e) = self.run_checked(link_up).await {
            warn!("Could not bring {} back up: {}", base, e);
        }
        info!("Monitor mode disabled on {} ({})", base, monitor);
        Ok(MonitorOutcome {
            output,
            monitor_interface: monitor,
        })
    }
}

/// Tracks the monitor interface currently enabled by this service; it is
/// the default interface for scans that do not name one.
pub struct MonitorManager {
    toggler: Arc<dyn MonitorToggler>,
    current: RwLock<Option<String>>,
}

impl MonitorManager {
    pub fn new(toggler: Arc<dyn MonitorToggler>) -> Self {
        Self {
            toggler,
            current: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    pub async fn enable(&self, interface: Option<&str>) -> Result<MonitorOutcome, WirelessError> {
        let base = validated(interface)?;
        let outcome = self.toggler.enable(base).await?;
        *self.current.write().await = Some(outcome.monitor_interface.clone());
        Ok(outcome)
    }

    pub async fn disable(&self, interface: Option<&str>) -> Result<MonitorOutcome, WirelessError> {
        let base = validated(interface)?;
        let outcome = self.toggler.disable(base).await?;
        let mut current = self.current.write().await;
        if current.as_deref() == Some(outcome.monitor_interface.as_str()) {
            *current = None;
        }
        Ok(outcome)
    }

    /// Disables the remembered monitor interface, if any. Used on shutdown.
    pub async fn disable_current(&self) -> Option<Result<MonitorOutcome, WirelessError>> {
        let monitor = self.current().await?;
        let base = monitor.strip_suffix(MONITOR_SUFFIX).unwrap_or(&monitor);
        Some(self.disable(Some(base)).await)
    }
}

fn validated(interface: Option<&str>) -> Result<&str, WirelessError> {
    let name = match interface.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return Err(WirelessError::MissingParameter("Interface")),
    };
    if !is_valid_interface_name(name) {
        return Err(WirelessError::InvalidInterface(name.to_string()));
    }
    Ok(name)
}

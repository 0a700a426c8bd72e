use async_trait::async_trait;
use log::debug;

use super::MONITOR_SUFFIX;
use crate::capture_process::ToolCommand;
use crate::error_handling::types::WirelessError;

/// Source of the host's network interface names.
#[async_trait]
pub trait InterfaceInventory: Send + Sync {
    /// Interface names usable as a scan base, excluding loopback and
    /// monitor-mode interfaces.
    async fn list_interfaces(&self) -> Result<Vec<String>, WirelessError>;
}

/// Lists interfaces with `ip -o link show`.
#[derive(Debug, Clone)]
pub struct IpLinkInventory {
    ip_path: String,
}

impl IpLinkInventory {
    pub fn new(ip_path: impl Into<String>) -> Self {
        Self {
            ip_path: ip_path.into(),
        }
    }
}

#[async_trait]
impl InterfaceInventory for IpLinkInventory {
    async fn list_interfaces(&self) -> Result<Vec<String>, WirelessError> {
        let command = ToolCommand::new(self.ip_path.as_str(), false).args(["-o", "link", "show"]);
        let output = command
            .run_to_completion()
            .await
            .map_err(|e| WirelessError::CommandFailed {
                command: command.display(),
                detail: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(WirelessError::CommandFailed {
                command: command.display(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let interfaces = parse_link_list(&String::from_utf8_lossy(&output.stdout));
        debug!("Found {} interface(s): {:?}", interfaces.len(), interfaces);
        Ok(interfaces)
    }
}

/// Extracts interface names from `ip link` output (`N: name[@parent]: ...`).
/// Continuation lines are ignored, so both the one-line and the default
/// format work.
pub fn parse_link_list(output: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in output.lines() {
        let mut parts = line.splitn(3, ": ");
        let (Some(index), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        if index.trim().parse::<u32>().is_err() {
            continue;
        }
        let name = name.split('@').next().unwrap_or(name).trim();
        if name.is_empty() || name == "lo" || name.ends_with(MONITOR_SUFFIX) {
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

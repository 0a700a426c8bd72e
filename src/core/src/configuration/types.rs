use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How network discovery reads the capture tool's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Tail the `<prefix>-01.csv` file the tool is asked to write.
    Csv,
    /// Parse the tool's live screen output line by line.
    FreeText,
}

impl Default for ParseMode {
    fn default() -> Self {
        ParseMode::Csv
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Origins allowed by the CORS filter in front of every route.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("127.0.0.1"),
            port: 5000,
            allowed_origins: vec![
                String::from("http://localhost:3000"),
                String::from("http://127.0.0.1:3000"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub airodump_path: String,
    pub airmon_path: String,
    pub ip_path: String,
    /// Prefix every external command with `sudo`.
    pub use_sudo: bool,
    /// Directory holding the per-session artifact files.
    pub work_dir: PathBuf,
    pub network_parse_mode: ParseMode,
    pub network_poll_interval_ms: u64,
    pub station_poll_interval_ms: u64,
    /// Window after spawn in which an exiting tool counts as a spawn failure.
    pub startup_grace_ms: u64,
    /// Time given to the process group after SIGTERM before SIGKILL.
    pub terminate_grace_ms: u64,
    /// Run `airmon-ng check kill` before enabling monitor mode.
    pub kill_interfering: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            airodump_path: String::from("airodump-ng"),
            airmon_path: String::from("airmon-ng"),
            ip_path: String::from("ip"),
            use_sudo: true,
            work_dir: std::env::temp_dir(),
            network_parse_mode: ParseMode::default(),
            network_poll_interval_ms: 2000,
            station_poll_interval_ms: 3000,
            startup_grace_ms: 500,
            terminate_grace_ms: 3000,
            kill_interfering: true,
        }
    }
}

impl CaptureConfig {
    pub fn network_poll_interval(&self) -> Duration {
        Duration::from_millis(self.network_poll_interval_ms)
    }

    pub fn station_poll_interval(&self) -> Duration {
        Duration::from_millis(self.station_poll_interval_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Stop a session once its last streaming consumer disconnects.
    pub stop_on_last_unsubscribe: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            stop_on_last_unsubscribe: true,
        }
    }
}

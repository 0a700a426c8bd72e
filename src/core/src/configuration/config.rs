use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::{debug, info};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Command-line arguments of the `airsight` binary.
///
/// Every flag is optional: without `--config` the built-in defaults are used,
/// and the remaining flags override whatever the file (or the defaults) say.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "airsight")]
#[command(about = "Wireless reconnaissance scan orchestrator")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(long, short = 'c', env = "AIRSIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the HTTP API binds to
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Port the HTTP API listens on
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for capture artifacts
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Run the capture tools directly instead of through sudo
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub no_sudo: bool,
}

/// Application configuration.
///
/// # Fields Overview
///
/// - `server`: where the HTTP API listens and which origins may call it
/// - `capture`: external tool paths, artifact directory, polling and
///   termination timings
/// - `sessions`: lifecycle policy shared by every scan session
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub sessions: SessionPolicy,
}

impl Config {
    /// Reads and validates a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from parsed arguments: file (if any), then
    /// command-line overrides, then validation.
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => {
                info!("No configuration file given, using defaults");
                Config::default()
            }
        };
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(addr) = &args.bind_address {
            self.server.bind_address = addr.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(dir) = &args.work_dir {
            self.capture.work_dir = dir.clone();
        }
        if args.no_sudo {
            self.capture.use_sudo = false;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_address.parse::<IpAddr>().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "server.bind_address '{}' is not an IP address",
                self.server.bind_address
            ))
        })?;

        for (name, value) in [
            ("capture.airodump_path", &self.capture.airodump_path),
            ("capture.airmon_path", &self.capture.airmon_path),
            ("capture.ip_path", &self.capture.ip_path),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!("{} is empty", name)));
            }
        }

        if !self.capture.work_dir.is_dir() {
            return Err(ConfigError::DirectoryDoesNotExist(
                self.capture.work_dir.display().to_string(),
            ));
        }

        if self.capture.network_poll_interval_ms == 0 || self.capture.station_poll_interval_ms == 0
        {
            return Err(ConfigError::InvalidValue(String::from(
                "poll intervals must be greater than zero",
            )));
        }

        for origin in &self.server.allowed_origins {
            let scheme_ok = origin.starts_with("http://") || origin.starts_with("https://");
            if !scheme_ok || origin.chars().any(char::is_whitespace) || origin.ends_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "server.allowed_origins entry '{}' is not an origin",
                    origin
                )));
            }
        }

        Ok(())
    }
}

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    InvalidValue(String),
    DirectoryDoesNotExist(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration value: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failures of the external capture process itself.
#[derive(Debug)]
pub enum CaptureError {
    /// The program could not be spawned at all (missing binary, permissions).
    SpawnFailed { program: String, source: std::io::Error },
    /// The program started but exited inside the readiness window.
    ExitedDuringStartup { status: String, output: Vec<String> },
    /// Sending a signal to the process group failed for a reason other than
    /// the group already being gone.
    SignalFailed(std::io::Error),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::SpawnFailed { program, source } => {
                write!(f, "Failed to spawn {}: {}", program, source)
            }
            CaptureError::ExitedDuringStartup { status, output } => {
                if output.is_empty() {
                    write!(f, "Capture tool exited during startup ({})", status)
                } else {
                    write!(
                        f,
                        "Capture tool exited during startup ({}): {}",
                        status,
                        output.join(" | ")
                    )
                }
            }
            CaptureError::SignalFailed(e) => write!(f, "Failed to signal process group: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Reasons a line of tool output did not become a record.
///
/// Never surfaced to callers; the consumption loop logs and drops these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseSkip {
    Blank,
    Header,
    TooFewFields { found: usize, needed: usize },
    InvalidMac(String),
    /// A row from a CSV section this session does not track.
    OtherSection,
}

impl fmt::Display for ParseSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseSkip::Blank => write!(f, "blank line"),
            ParseSkip::Header => write!(f, "header line"),
            ParseSkip::TooFewFields { found, needed } => {
                write!(f, "too few fields ({} < {})", found, needed)
            }
            ParseSkip::InvalidMac(m) => write!(f, "invalid MAC address '{}'", m),
            ParseSkip::OtherSection => write!(f, "row from an untracked section"),
        }
    }
}

impl std::error::Error for ParseSkip {}

#[derive(Debug)]
pub enum SessionError {
    Spawn(CaptureError),
    MissingParameter(&'static str),
    InvalidParameter(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Spawn(e) => write!(f, "Scan could not be started: {}", e),
            SessionError::MissingParameter(p) => write!(f, "{} parameter missing", p),
            SessionError::InvalidParameter(e) => write!(f, "Invalid parameter: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        SessionError::Spawn(err)
    }
}

#[derive(Debug)]
pub enum CleanupError {
    Terminate(CaptureError),
    ArtifactRemoval { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupError::Terminate(e) => write!(f, "Process termination failed: {}", e),
            CleanupError::ArtifactRemoval { path, source } => {
                write!(f, "Failed to remove {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CleanupError {}

#[derive(Debug)]
pub enum WirelessError {
    MissingParameter(&'static str),
    InvalidInterface(String),
    CommandFailed { command: String, detail: String },
}

impl fmt::Display for WirelessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WirelessError::MissingParameter(p) => write!(f, "{} parameter missing", p),
            WirelessError::InvalidInterface(i) => write!(f, "Invalid interface name '{}'", i),
            WirelessError::CommandFailed { command, detail } => {
                write!(f, "Command '{}' failed: {}", command, detail)
            }
        }
    }
}

impl std::error::Error for WirelessError {}


#[derive(Debug)]
pub enum WebError {
    InvalidBindAddress(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::InvalidBindAddress(e) => write!(f, "Invalid bind address: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    WebError(WebError),
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web server error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}

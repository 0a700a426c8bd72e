use log::debug;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Description of an external tool invocation.
///
/// Used both for the long-running capture process and for the one-shot
/// helpers (`airmon-ng`, `ip`). When `use_sudo` is set the program is run as
/// `sudo -n <program> <args...>` so a missing credential fails fast instead of
/// blocking on a password prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub use_sudo: bool,
    pub working_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, use_sudo: bool) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            use_sudo,
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Program actually executed (`sudo` when elevated).
    pub fn executable(&self) -> &str {
        if self.use_sudo {
            "sudo"
        } else {
            &self.program
        }
    }

    /// Full argument vector passed to [`executable`](Self::executable).
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        if self.use_sudo {
            argv.push(String::from("-n"));
            argv.push(self.program.clone());
        }
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Human-readable command line for logs and error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![self.executable().to_string()];
        parts.extend(self.argv());
        parts.join(" ")
    }

    /// Builds a tokio command with stdin closed. Stdout/stderr are left to the
    /// caller.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(self.executable());
        cmd.args(self.argv()).stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Runs the command to completion and collects its output.
    pub async fn run_to_completion(&self) -> Result<Output, std::io::Error> {
        debug!("Running: {}", self.display());
        let mut cmd = self.to_command();
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.output().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command_line() {
        let cmd = ToolCommand::new("airodump-ng", false)
            .args(["--write", "/tmp/x"])
            .arg("wlan0mon");
        assert_eq!(cmd.executable(), "airodump-ng");
        assert_eq!(cmd.argv(), vec!["--write", "/tmp/x", "wlan0mon"]);
        assert_eq!(cmd.display(), "airodump-ng --write /tmp/x wlan0mon");
    }

    #[test]
    fn test_sudo_prefix() {
        let cmd = ToolCommand::new("airmon-ng", true).args(["start", "wlan0"]);
        assert_eq!(cmd.executable(), "sudo");
        assert_eq!(cmd.argv(), vec!["-n", "airmon-ng", "start", "wlan0"]);
        assert_eq!(cmd.display(), "sudo -n airmon-ng start wlan0");
    }

    #[tokio::test]
    async fn test_run_to_completion_collects_stdout() {
        let out = ToolCommand::new("sh", false)
            .args(["-c", "echo ready"])
            .run_to_completion()
            .await
            .unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "ready");
    }
}

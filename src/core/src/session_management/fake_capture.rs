//! Stand-in for the capture tool used by the session tests.
//!
//! The generated script understands the `--write`/`-w` prefix option so it
//! can drop artifacts where a real capture would, then runs a caller-supplied
//! body.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

use super::session::SessionSettings;
use super::subscription::Subscription;
use super::types::ScanEvent;
use crate::configuration::{CaptureConfig, ParseMode, SessionPolicy};

pub const CSV_FIXTURE: &str = "\
BSSID, First time seen, Last time seen, channel, Speed, Privacy, Cipher, Authentication, Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key
AA:BB:CC:DD:EE:FF, 2024-05-01 10:00:00, 2024-05-01 10:00:09,  6,  54, WPA2, CCMP, PSK, -45,       12,        0,   0.  0.  0.  0,   4, home,
11:22:33:44:55:66, 2024-05-01 10:00:01, 2024-05-01 10:00:08, 11,  54, OPN, , , -70,        3,        0,   0.  0.  0.  0,   0, ,

Station MAC, First time seen, Last time seen, Power, # packets, BSSID, Probed ESSIDs
AA:11:22:33:44:55, t1, t2, -60, 5, AA:BB:CC:DD:EE:FF,
BB:11:22:33:44:66, t3, t4, -70, 2, AA:BB:CC:DD:EE:FF, probe1
";

const ARG_PARSING: &str = r#"#!/bin/sh
prefix=""
while [ $# -gt 0 ]; do
  case "$1" in
    --write|-w) prefix="$2"; shift 2 ;;
    *) shift ;;
  esac
done
"#;

pub struct FakeCapture {
    root: TempDir,
    script: PathBuf,
}

impl FakeCapture {
    /// A capture whose script runs `body` after argument parsing. `$prefix`
    /// holds the artifact prefix when one was passed.
    pub fn with_body(body: &str) -> Self {
        let root = TempDir::new().expect("temp dir");
        std::fs::create_dir(root.path().join("bin")).expect("bin dir");
        std::fs::create_dir(root.path().join("work")).expect("work dir");

        let script = root.path().join("bin").join("airodump-ng");
        std::fs::write(&script, format!("{}{}\n", ARG_PARSING, body)).expect("write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");

        Self { root, script }
    }

    /// Writes `csv` plus a capture file to the prefix, then keeps running.
    pub fn writing_csv(csv: &str) -> Self {
        Self::with_body(&format!(
            "cat > \"$prefix-01.csv\" <<'CSV'\n{}CSV\n: > \"$prefix-01.cap\"\nexec sleep 30",
            csv
        ))
    }

    /// Writes `csv`, stays up past the startup window, then exits with `code`.
    pub fn writing_csv_then_exiting(csv: &str, code: i32) -> Self {
        Self::with_body(&format!(
            "cat > \"$prefix-01.csv\" <<'CSV'\n{}CSV\nsleep 0.4\nexit {}",
            csv, code
        ))
    }

    /// Prints `lines` on stderr like the live screen output, then keeps running.
    pub fn printing(lines: &[&str]) -> Self {
        let quoted: Vec<String> = lines.iter().map(|l| format!("'{}'", l)).collect();
        Self::with_body(&format!(
            "printf '%s\\n' {} >&2\nexec sleep 30",
            quoted.join(" ")
        ))
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    pub fn settings(&self, mode: ParseMode) -> SessionSettings {
        SessionSettings {
            capture: CaptureConfig {
                airodump_path: self.script.display().to_string(),
                use_sudo: false,
                work_dir: self.work_dir(),
                network_parse_mode: mode,
                network_poll_interval_ms: 50,
                station_poll_interval_ms: 50,
                startup_grace_ms: 150,
                terminate_grace_ms: 1000,
                ..CaptureConfig::default()
            },
            policy: SessionPolicy::default(),
        }
    }

    /// Files currently left in the work directory.
    pub fn leftover_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.work_dir())
            .expect("read work dir")
            .map(|e| e.expect("dir entry").path())
            .collect();
        files.sort();
        files
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

pub async fn next_event(subscription: &mut Subscription) -> ScanEvent {
    timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("timed out waiting for a scan event")
        .expect("event feed closed")
}

/// Receives events until one satisfies `pred`, returning it.
pub async fn event_matching<F>(subscription: &mut Subscription, mut pred: F) -> ScanEvent
where
    F: FnMut(&ScanEvent) -> bool,
{
    loop {
        let event = next_event(subscription).await;
        if pred(&event) {
            return event;
        }
    }
}

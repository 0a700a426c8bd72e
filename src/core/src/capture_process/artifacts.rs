use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error_handling::types::CleanupError;

/// Files written by a network-discovery capture.
pub const NETWORK_SUFFIXES: &[&str] = &[
    "-01.csv",
    "-01.kismet.csv",
    "-01.netxml",
    "-01.kismet.netxml",
    "-01.log.csv",
    "-01.cap",
];

/// Files written by a station-discovery capture.
pub const STATION_SUFFIXES: &[&str] = NETWORK_SUFFIXES;

/// The temporary files one capture owns: a path prefix handed to the tool
/// plus the suffixes it is known to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    prefix: PathBuf,
    suffixes: &'static [&'static str],
}

impl ArtifactSet {
    pub fn new(prefix: impl Into<PathBuf>, suffixes: &'static [&'static str]) -> Self {
        Self {
            prefix: prefix.into(),
            suffixes,
        }
    }

    /// `<work_dir>/<stem>_<id>` with a fresh id.
    pub fn new_in(work_dir: &Path, stem: &str, suffixes: &'static [&'static str]) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self::new(work_dir.join(format!("{}_{}", stem, id)), suffixes)
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// The prefix as passed on the tool's command line.
    pub fn prefix_arg(&self) -> String {
        self.prefix.to_string_lossy().into_owned()
    }

    pub fn csv_path(&self) -> PathBuf {
        self.with_suffix("-01.csv")
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.suffixes.iter().map(|s| self.with_suffix(s)).collect()
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut raw = self.prefix.clone().into_os_string();
        raw.push(suffix);
        PathBuf::from(raw)
    }

    /// Removes every known artifact. Missing files are skipped; other
    /// failures are collected and the remaining files are still attempted.
    pub fn remove_all(&self) -> (Vec<PathBuf>, Vec<CleanupError>) {
        let mut removed = Vec::new();
        let mut errors = Vec::new();
        for path in self.paths() {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed {}", path.display());
                    removed.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    warn!("Failed to remove {}: {}", path.display(), source);
                    errors.push(CleanupError::ArtifactRemoval { path, source });
                }
            }
        }
        (removed, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prefix_layout() {
        let dir = TempDir::new().unwrap();
        let set = ArtifactSet::new_in(dir.path(), "airodump_devices", STATION_SUFFIXES);
        let name = set.prefix().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("airodump_devices_"));
        assert_eq!(name.len(), "airodump_devices_".len() + 32);
        assert_eq!(
            set.csv_path(),
            PathBuf::from(format!("{}-01.csv", set.prefix_arg()))
        );
        assert_eq!(set.paths().len(), 6);
    }

    #[test]
    fn test_remove_all_skips_missing_files() {
        let dir = TempDir::new().unwrap();
        let set = ArtifactSet::new(dir.path().join("airodump_x"), NETWORK_SUFFIXES);
        std::fs::write(set.csv_path(), "BSSID\n").unwrap();
        std::fs::write(dir.path().join("airodump_x-01.cap"), b"\xd4\xc3\xb2\xa1").unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), "keep").unwrap();

        let (removed, errors) = set.remove_all();
        assert!(errors.is_empty());
        assert_eq!(removed.len(), 2);
        assert!(!set.csv_path().exists());
        assert!(dir.path().join("unrelated.txt").exists());

        let (removed, errors) = set.remove_all();
        assert!(removed.is_empty());
        assert!(errors.is_empty());
    }
}

//! Incremental reader for the CSV artifact the capture tool keeps rewriting.
//!
//! The tool rewrites the whole file in place every few seconds, so a byte
//! offset is useless as a cursor. Instead the tail remembers the raw lines it
//! has already handed out and only returns lines it has not seen yet. The
//! seen set accumulates across polls, so a read that catches the file halfway
//! through a rewrite does not make earlier rows look new again. Once it holds
//! [`MAX_SEEN_LINES`] entries the oldest ones are forgotten first.

use super::csv_rows::{is_station_marker, CsvSection};
use log::trace;
use std::collections::{HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

pub const MAX_SEEN_LINES: usize = 50_000;

/// A previously unseen, non-blank line and the section it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailedRow {
    pub section: CsvSection,
    pub line: String,
}

#[derive(Debug)]
pub struct CsvTail {
    path: PathBuf,
    seen: HashSet<String>,
    /// Insertion order of `seen`, for eviction.
    order: VecDeque<String>,
    polls: u64,
}

impl CsvTail {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            seen: HashSet::new(),
            order: VecDeque::new(),
            polls: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file and returns the rows that were not returned before, in
    /// file order. A missing file yields no rows.
    ///
    /// A trailing line without a newline is treated as still being written
    /// and is left for the next poll.
    pub async fn poll(&mut self) -> Result<Vec<TailedRow>, io::Error> {
        self.polls += 1;
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("{} not written yet (poll {})", self.path.display(), self.polls);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let content = String::from_utf8_lossy(&bytes);
        Ok(self.ingest(&content))
    }

    fn ingest(&mut self, content: &str) -> Vec<TailedRow> {
        let complete = match content.rfind('\n') {
            Some(idx) => &content[..=idx],
            None => "",
        };

        let mut section = CsvSection::AccessPoints;
        let mut fresh = Vec::new();

        for raw in complete.lines() {
            let line = raw.trim_end_matches('\r').trim();
            if line.is_empty() {
                continue;
            }
            if is_station_marker(line) {
                section = CsvSection::Stations;
                continue;
            }
            if self.remember(line) {
                fresh.push(TailedRow {
                    section,
                    line: line.to_string(),
                });
            }
        }

        trace!(
            "{}: {} new row(s), {} tracked (poll {})",
            self.path.display(),
            fresh.len(),
            self.seen.len(),
            self.polls
        );
        fresh
    }

    /// Records `line` as seen. Returns `false` if it already was.
    fn remember(&mut self, line: &str) -> bool {
        if self.seen.contains(line) {
            return false;
        }
        if self.order.len() >= MAX_SEEN_LINES {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(line.to_string());
        self.order.push_back(line.to_string());
        true
    }
}

use log::{debug, trace};
use regex::Regex;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use super::types::{OutputLine, StdioStream};

/// Capacity of the merged stdout/stderr line channel.
pub const LINE_CHANNEL_CAPACITY: usize = 1024;

fn escape_pattern() -> &'static Regex {
    static ESCAPES: OnceLock<Regex> = OnceLock::new();
    ESCAPES.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b[()][A-Z0-9]|\x1b[=>]")
            .expect("escape pattern is valid")
    })
}

/// Decodes a raw output segment: lossy UTF-8, terminal escape sequences and
/// carriage returns removed.
pub fn clean_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    escape_pattern()
        .replace_all(&text, "")
        .replace('\r', "")
}

/// Reads `reader` until EOF and forwards every newline-delimited segment as
/// an [`OutputLine`]. Returns the number of segments read.
///
/// Keeps draining after the receiving side has gone away so the child never
/// blocks on a full pipe.
pub async fn forward_lines<R>(reader: R, stream: StdioStream, tx: mpsc::Sender<OutputLine>) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut count = 0usize;
    let mut receiver_open = true;

    loop {
        match segments.next_segment().await {
            Ok(Some(raw)) => {
                count += 1;
                if !receiver_open {
                    continue;
                }
                let text = clean_line(&raw);
                trace!("[{:?}] {}", stream, text);
                if tx.send(OutputLine { stream, text }).await.is_err() {
                    debug!("{:?} receiver dropped, discarding further output", stream);
                    receiver_open = false;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("{:?} read error: {}", stream, e);
                break;
            }
        }
    }

    debug!("{:?} monitoring ended after {} line(s)", stream, count);
    count
}

/// Lazy sequence of lines produced by a capture process.
///
/// Ends (returns `None`) once both of the child's pipes are closed.
#[derive(Debug)]
pub struct OutputLines {
    rx: mpsc::Receiver<OutputLine>,
}

impl OutputLines {
    pub fn new(rx: mpsc::Receiver<OutputLine>) -> Self {
        Self { rx }
    }

    pub async fn next_line(&mut self) -> Option<OutputLine> {
        self.rx.recv().await
    }
}

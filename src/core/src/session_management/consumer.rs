//! The per-session consumption loop: the only writer of a session's records.

use log::{debug, info, trace, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::cleanup;
use super::session::ScanSession;
use super::types::{EndReason, ScanKind};
use crate::capture_process::{OutputLine, OutputLines};
use crate::configuration::ParseMode;
use crate::parsing::{
    parse_access_point_row, parse_network_line, parse_station_row, CsvSection, CsvTail, TailedRow,
};

/// Drives `session` until a stop is requested or the tool exits, then runs
/// cleanup.
pub(super) async fn run(
    session: Arc<ScanSession>,
    mut output: Option<OutputLines>,
    mut stop_rx: watch::Receiver<Option<EndReason>>,
) {
    let id = session.id();
    let mode = session.parse_mode();
    let mut tail = CsvTail::new(session.artifacts().csv_path());
    let mut ticker = tokio::time::interval(session.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!("[{}] Consumer started ({:?} mode)", id, mode);

    let reason = loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break EndReason::Shutdown;
                }
                let requested = stop_rx.borrow_and_update().clone();
                if let Some(reason) = requested {
                    break reason;
                }
            }
            line = next_line(&mut output) => match line {
                Some(line) => handle_line(&session, mode, line),
                None => {
                    debug!("[{}] Capture output closed", id);
                    output = None;
                }
            },
            _ = ticker.tick() => {
                if mode == ParseMode::Csv {
                    match tail.poll().await {
                        Ok(rows) => {
                            for row in rows {
                                handle_row(&session, row);
                            }
                        }
                        Err(e) => warn!("[{}] Failed to read {}: {}", id, tail.path().display(), e),
                    }
                }
                if let Some(status) = session.process().try_exit_status() {
                    info!("[{}] Capture process exited: {}", id, status);
                    break EndReason::ProcessExited { status: status.to_string() };
                }
            }
        }
    };

    cleanup::run(&session, reason).await;
    debug!("[{}] Consumer finished", id);
}

async fn next_line(output: &mut Option<OutputLines>) -> Option<OutputLine> {
    match output {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

fn handle_line(session: &ScanSession, mode: ParseMode, line: OutputLine) {
    if mode != ParseMode::FreeText {
        trace!("[{}] {:?}: {}", session.id(), line.stream, line.text);
        return;
    }
    match parse_network_line(&line.text) {
        Ok(record) => session.ingest_network(record),
        Err(skip) => trace!("[{}] Skipped line ({}): {}", session.id(), skip, line.text),
    }
}

fn handle_row(session: &ScanSession, row: TailedRow) {
    let result = match (session.kind(), row.section) {
        (ScanKind::NetworkDiscovery, CsvSection::AccessPoints) => {
            parse_access_point_row(&row.line).map(|record| session.ingest_network(record))
        }
        (ScanKind::StationDiscovery, CsvSection::Stations) => {
            parse_station_row(&row.line).map(|station| session.ingest_station(station))
        }
        _ => Ok(()),
    };
    if let Err(skip) = result {
        trace!("[{}] Skipped row ({}): {}", session.id(), skip, row.line);
    }
}

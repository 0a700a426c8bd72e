//! The live record set of a session.
//!
//! Network discovery keeps one record per BSSID in first-seen order;
//! station discovery keeps only the first and the latest station row.

use serde::Serialize;
use std::collections::HashMap;

use super::types::{ScanEvent, ScanKind};
use crate::parsing::types::{NetworkRecord, StationRecord};

/// Effect of merging one record into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Unchanged,
}

impl MergeOutcome {
    pub fn is_change(&self) -> bool {
        !matches!(self, MergeOutcome::Unchanged)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkTable {
    records: Vec<NetworkRecord>,
    index: HashMap<String, usize>,
}

impl NetworkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new BSSID or overwrites the stored record for it.
    pub fn merge(&mut self, record: NetworkRecord) -> MergeOutcome {
        match self.index.get(&record.bssid) {
            Some(&pos) => {
                if self.records[pos] == record {
                    MergeOutcome::Unchanged
                } else {
                    self.records[pos] = record;
                    MergeOutcome::Updated
                }
            }
            None => {
                self.index.insert(record.bssid.clone(), self.records.len());
                self.records.push(record);
                MergeOutcome::Inserted
            }
        }
    }

    pub fn get(&self, bssid: &str) -> Option<&NetworkRecord> {
        self.index.get(bssid).map(|&pos| &self.records[pos])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[NetworkRecord] {
        &self.records
    }
}

/// First- and last-observed station of a station-discovery scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StationWindow {
    pub first_device: Option<StationRecord>,
    pub last_device: Option<StationRecord>,
}

impl StationWindow {
    /// Records a station row. The first device keeps its identity for the
    /// whole scan but its fields follow later rows for the same MAC; the last
    /// device is always the most recent row. Returns whether the window
    /// changed.
    pub fn observe(&mut self, station: StationRecord) -> bool {
        let mut changed = false;
        match &mut self.first_device {
            None => {
                self.first_device = Some(station.clone());
                changed = true;
            }
            Some(first) if first.mac == station.mac && *first != station => {
                *first = station.clone();
                changed = true;
            }
            Some(_) => {}
        }
        if self.last_device.as_ref() != Some(&station) {
            self.last_device = Some(station);
            changed = true;
        }
        changed
    }

    pub fn len(&self) -> usize {
        match (&self.first_device, &self.last_device) {
            (None, _) => 0,
            (Some(first), Some(last)) if first.mac != last.mac => 2,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_device.is_none()
    }
}

/// The record set a session owns, by scan kind.
#[derive(Debug, Clone)]
pub enum RecordSet {
    Networks(NetworkTable),
    Stations(StationWindow),
}

impl RecordSet {
    pub fn for_kind(kind: ScanKind) -> Self {
        match kind {
            ScanKind::NetworkDiscovery => RecordSet::Networks(NetworkTable::new()),
            ScanKind::StationDiscovery => RecordSet::Stations(StationWindow::default()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordSet::Networks(table) => table.len(),
            RecordSet::Stations(window) => window.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events that bring a fresh subscriber up to date.
    pub fn snapshot_events(&self) -> Vec<ScanEvent> {
        match self {
            RecordSet::Networks(table) => table
                .records()
                .iter()
                .cloned()
                .map(|data| ScanEvent::Network { data })
                .collect(),
            RecordSet::Stations(window) if window.is_empty() => Vec::new(),
            RecordSet::Stations(window) => vec![ScanEvent::Devices {
                data: window.clone(),
            }],
        }
    }

    pub fn networks(&self) -> Vec<NetworkRecord> {
        match self {
            RecordSet::Networks(table) => table.records().to_vec(),
            RecordSet::Stations(_) => Vec::new(),
        }
    }

    pub fn station_window(&self) -> Option<&StationWindow> {
        match self {
            RecordSet::Stations(window) => Some(window),
            RecordSet::Networks(_) => None,
        }
    }
}

//! Positional parsers for the two sections of the tool's CSV artifact.
//!
//! The file starts with an access-point table
//! (`BSSID, First time seen, Last time seen, channel, Speed, Privacy, Cipher,
//! Authentication, Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key`)
//! followed by a station table introduced by a `Station MAC, ...` header
//! (`Station MAC, First time seen, Last time seen, Power, # packets, BSSID,
//! Probed ESSIDs`).

use super::types::{canonical_mac, is_mac_address, NetworkRecord, SignalPower, StationRecord};
use crate::error_handling::types::ParseSkip;
use serde::Serialize;

pub const STATION_MARKER: &str = "Station MAC";
const AP_HEADER_MARKER: &str = "BSSID";

const AP_MIN_FIELDS: usize = 14;
const AP_CHANNEL: usize = 3;
const AP_PRIVACY: usize = 5;
const AP_POWER: usize = 8;
const AP_ESSID: usize = 13;

const STATION_MIN_FIELDS: usize = 6;

/// Which table of the CSV artifact a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CsvSection {
    AccessPoints,
    Stations,
}

pub fn is_station_marker(line: &str) -> bool {
    line.contains(STATION_MARKER)
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(|f| f.trim()).collect()
}

pub fn parse_access_point_row(line: &str) -> Result<NetworkRecord, ParseSkip> {
    if line.trim().is_empty() {
        return Err(ParseSkip::Blank);
    }
    if line.contains(AP_HEADER_MARKER) || is_station_marker(line) {
        return Err(ParseSkip::Header);
    }

    let fields = split_fields(line);
    if fields.len() < AP_MIN_FIELDS {
        return Err(ParseSkip::TooFewFields {
            found: fields.len(),
            needed: AP_MIN_FIELDS,
        });
    }
    if !is_mac_address(fields[0]) {
        return Err(ParseSkip::InvalidMac(fields[0].to_string()));
    }

    // The ESSID may itself contain commas; everything up to the trailing Key
    // column belongs to it.
    let essid_end = if fields.len() > AP_MIN_FIELDS {
        fields.len() - 1
    } else {
        fields.len()
    };
    let essid = fields[AP_ESSID..essid_end].join(",");

    Ok(NetworkRecord {
        bssid: canonical_mac(fields[0]),
        power: SignalPower::parse(fields[AP_POWER]),
        channel: fields[AP_CHANNEL].parse().ok(),
        encryption: fields[AP_PRIVACY].to_string(),
        essid,
    })
}

pub fn parse_station_row(line: &str) -> Result<StationRecord, ParseSkip> {
    if line.trim().is_empty() {
        return Err(ParseSkip::Blank);
    }
    if is_station_marker(line) {
        return Err(ParseSkip::Header);
    }

    let fields = split_fields(line);
    if fields.len() < STATION_MIN_FIELDS {
        return Err(ParseSkip::TooFewFields {
            found: fields.len(),
            needed: STATION_MIN_FIELDS,
        });
    }
    if !is_mac_address(fields[0]) {
        return Err(ParseSkip::InvalidMac(fields[0].to_string()));
    }

    let probed_essids = fields[STATION_MIN_FIELDS..]
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| f.to_string())
        .collect();

    Ok(StationRecord {
        mac: canonical_mac(fields[0]),
        first_seen: fields[1].to_string(),
        last_seen: fields[2].to_string(),
        power: SignalPower::parse(fields[3]),
        packets: fields[4].parse().unwrap_or(0),
        bssid: fields[5].to_string(),
        probed_essids,
    })
}

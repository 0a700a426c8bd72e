//! Parser for the capture tool's live screen output.
//!
//! Each access-point line looks like
//! `BSSID PWR Beacons #Data #/s CH MB ENC CIPHER AUTH ESSID`; fields are taken
//! by position after whitespace tokenization.

use super::types::{canonical_mac, is_mac_address, NetworkRecord, SignalPower};
use crate::error_handling::types::ParseSkip;

const MIN_TOKENS: usize = 10;
const HEADER_MARKERS: [&str; 3] = ["BSSID", "CH", "STATION"];

const POWER: usize = 1;
const CHANNEL: usize = 5;
const ENCRYPTION: usize = 7;
const ESSID_START: usize = 10;

/// Parses one line of free-text output into a [`NetworkRecord`].
///
/// Never panics; every line either yields a record or a [`ParseSkip`].
pub fn parse_network_line(line: &str) -> Result<NetworkRecord, ParseSkip> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseSkip::Blank);
    }
    if HEADER_MARKERS.iter().any(|marker| line.contains(marker)) {
        return Err(ParseSkip::Header);
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return Err(ParseSkip::TooFewFields {
            found: tokens.len(),
            needed: MIN_TOKENS,
        });
    }
    if !is_mac_address(tokens[0]) {
        return Err(ParseSkip::InvalidMac(tokens[0].to_string()));
    }
    // Station rows start with the AP's BSSID followed by the station MAC.
    if is_mac_address(tokens[1]) {
        return Err(ParseSkip::OtherSection);
    }

    Ok(NetworkRecord {
        bssid: canonical_mac(tokens[0]),
        power: SignalPower::parse(tokens[POWER]),
        channel: tokens[CHANNEL].parse().ok(),
        encryption: tokens[ENCRYPTION].to_string(),
        essid: tokens[ESSID_START..].join(" "),
    })
}

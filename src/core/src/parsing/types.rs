//! Record types produced by the parsers.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

/// Received signal strength as printed by the capture tool.
///
/// The tool prints `-1` or garbage for stations/APs it cannot measure; anything
/// that is not an integer becomes [`SignalPower::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPower {
    Dbm(i32),
    Unknown,
}

impl SignalPower {
    pub fn parse(token: &str) -> Self {
        match token.trim().parse::<i32>() {
            Ok(v) => SignalPower::Dbm(v),
            Err(_) => SignalPower::Unknown,
        }
    }
}

impl fmt::Display for SignalPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalPower::Dbm(v) => write!(f, "{}", v),
            SignalPower::Unknown => write!(f, "unknown"),
        }
    }
}

// Serialized as a string to keep the wire format the web client expects.
impl Serialize for SignalPower {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn serialize_channel<S: Serializer>(channel: &Option<u16>, serializer: S) -> Result<S::Ok, S::Error> {
    match channel {
        Some(c) => serializer.collect_str(c),
        None => serializer.serialize_none(),
    }
}

/// One observed access point. Keyed by `bssid` inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkRecord {
    pub bssid: String,
    pub power: SignalPower,
    #[serde(serialize_with = "serialize_channel")]
    pub channel: Option<u16>,
    pub encryption: String,
    pub essid: String,
}

/// A client device seen in the station section of the tool's CSV output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationRecord {
    pub mac: String,
    pub first_seen: String,
    pub last_seen: String,
    pub power: SignalPower,
    pub packets: u64,
    /// Associated BSSID, or the tool's `(not associated)` marker.
    pub bssid: String,
    pub probed_essids: Vec<String>,
}

fn mac_pattern() -> &'static Regex {
    static MAC: OnceLock<Regex> = OnceLock::new();
    MAC.get_or_init(|| {
        Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").expect("MAC pattern is valid")
    })
}

pub fn is_mac_address(token: &str) -> bool {
    mac_pattern().is_match(token)
}

/// Upper-cases a MAC so the same device always maps to the same key.
pub fn canonical_mac(token: &str) -> String {
    token.trim().to_ascii_uppercase()
}

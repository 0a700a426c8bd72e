//! Host-side wireless helpers: which interfaces exist and switching one into
//! monitor mode. Both sit behind traits so the web layer can be exercised
//! without touching real hardware.

use regex::Regex;
use std::sync::OnceLock;

pub mod interface_inventory;
pub mod monitor_mode;

pub use interface_inventory::{InterfaceInventory, IpLinkInventory};
pub use monitor_mode::{AirmonToggler, MonitorManager, MonitorOutcome, MonitorToggler};

/// Suffix `airmon-ng` appends to the monitor-mode interface it creates.
pub const MONITOR_SUFFIX: &str = "mon";

fn interface_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.:-]{1,15}$").expect("interface pattern is valid")
    })
}

/// Kernel interface names are at most 15 bytes; anything outside this
/// character set is rejected before it reaches a command line.
pub fn is_valid_interface_name(name: &str) -> bool {
    interface_pattern().is_match(name)
}

/// Name of the monitor interface created for `base`.
pub fn monitor_name(base: &str) -> String {
    format!("{}{}", base, MONITOR_SUFFIX)
}

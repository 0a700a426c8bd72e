//! Turns raw capture-tool output into records.
//!
//! Two input shapes are supported: the tool's free-text screen output
//! ([`free_text`]) and the CSV artifact it writes when asked to
//! ([`csv_rows`], tailed by [`csv_tail`]). Parsers are total: a line either
//! becomes a record or a [`ParseSkip`](crate::error_handling::types::ParseSkip).

pub mod csv_rows;
pub mod csv_tail;
pub mod free_text;
pub mod types;

pub use csv_rows::{parse_access_point_row, parse_station_row, CsvSection};
pub use csv_tail::{CsvTail, TailedRow};
pub use free_text::parse_network_line;
pub use types::{NetworkRecord, SignalPower, StationRecord};

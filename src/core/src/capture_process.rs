//! Supervision of the external capture tool.
//!
//! [`CaptureProcess`] owns one child running in its own process group,
//! [`ToolCommand`] describes how it (and the short-lived helper tools) are
//! invoked, and [`ArtifactSet`] names the temporary files a capture leaves
//! behind.

pub mod artifacts;
pub mod command;
pub mod output;
pub mod process_handle;
pub mod types;

pub use artifacts::{ArtifactSet, NETWORK_SUFFIXES, STATION_SUFFIXES};
pub use command::ToolCommand;
pub use output::OutputLines;
pub use process_handle::CaptureProcess;
pub use types::{OutputLine, ReapOutcome, StdioStream, TerminateOutcome};

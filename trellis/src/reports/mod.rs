//! Report data structures for commands.
//!
//! This module provides data structures that separate data collection from rendering.
//! Commands build reports, then render them to an Output target.

mod build;
mod check;
mod explain;
mod output;

pub use build::BuildReport;
pub use check::{CheckReport, UnitStatus};
pub use explain::{ExplainReport, ExtensionInfo, PluginInfo, PointInfo, ProjectInfo, StageInfo};
#[cfg(test)]
pub use output::PlainOutput;
pub use output::{Output, Report, TerminalOutput};

//! Check command report data structures.

use std::path::PathBuf;

use super::output::{Output, Report};

/// Report data from analyzing every unit.
#[derive(Debug)]
pub struct CheckReport {
    /// Path to the config file.
    pub config_path: PathBuf,
    /// Per-unit results, in manifest order.
    pub units: Vec<UnitStatus>,
    /// Formatted diagnostics, unit by unit.
    pub diagnostics: Vec<String>,
    /// Internal failures, prefixed with the unit name.
    pub faults: Vec<String>,
    pub error_count: usize,
    pub warning_count: usize,
}

/// Whether one unit got through.
#[derive(Debug)]
pub struct UnitStatus {
    pub name: String,
    pub passed: bool,
}

impl CheckReport {
    /// Whether every unit passed analysis.
    pub fn is_valid(&self) -> bool {
        self.units.iter().all(|u| u.passed)
    }
}

impl Report for CheckReport {
    fn render(&self, out: &mut dyn Output) {
        for diagnostic in &self.diagnostics {
            out.diagnostic(diagnostic);
        }
        for fault in &self.faults {
            out.error(fault);
        }
        if !self.diagnostics.is_empty() || !self.faults.is_empty() {
            out.newline();
        }

        let passed = self.units.iter().filter(|u| u.passed).count();
        let summary = format!(
            "{}/{} units passed ({} errors, {} warnings)",
            passed,
            self.units.len(),
            self.error_count,
            self.warning_count
        );
        if self.is_valid() {
            out.preformatted(&format!("✓ {}: {}", self.config_path.display(), summary));
        } else {
            out.preformatted(&format!("✗ {}: {}", self.config_path.display(), summary));
        }
    }
}

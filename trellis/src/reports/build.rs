//! Build command report data structures.

use std::path::PathBuf;

use super::{
    UnitStatus,
    output::{Output, Report},
};

/// Report data from a full build.
#[derive(Debug)]
pub struct BuildReport {
    pub target: String,
    pub out_dir: PathBuf,
    /// Per-unit results, in manifest order.
    pub units: Vec<UnitStatus>,
    /// Artifact file names written under `out_dir`.
    pub written: Vec<String>,
    /// Artifacts already on disk with identical content.
    pub unchanged: Vec<String>,
    pub diagnostics: Vec<String>,
    pub faults: Vec<String>,
    pub snapshots_dir: Option<PathBuf>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.units.iter().all(|u| u.passed)
    }
}

impl Report for BuildReport {
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

        out.key_value("Target", &self.target);
        out.key_value("Output", &self.out_dir.display().to_string());
        if let Some(dir) = &self.snapshots_dir {
            out.key_value("Snapshots", &dir.display().to_string());
        }
        out.newline();

        out.section("Units");
        for unit in &self.units {
            if unit.passed {
                out.added_item(&unit.name);
            } else {
                out.removed_item(&format!("{} (failed)", unit.name));
            }
        }

        if !self.written.is_empty() {
            out.newline();
            out.section("Written");
            for file in &self.written {
                out.list_item(file);
            }
        }

        if !self.unchanged.is_empty() {
            out.newline();
            out.section("Unchanged");
            for file in &self.unchanged {
                out.list_item(file);
            }
        }
    }
}

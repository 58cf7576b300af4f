//! Per-unit and per-run results.

use crate::{Diagnostic, PipelineFault, codegen::Artifact};

/// How a unit's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Every stage ran and produced an artifact.
    Compiled(Artifact),
    /// Analysis accepted the unit; later stages were not requested.
    Checked,
    /// Analysis reported at least one error.
    Rejected,
    /// An internal failure stopped the unit.
    Faulted(PipelineFault),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit: String,
    /// Sorted by location, then reporter registration order.
    pub diagnostics: Vec<Diagnostic>,
    pub outcome: UnitOutcome,
}

impl UnitReport {
    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.outcome {
            UnitOutcome::Compiled(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn fault(&self) -> Option<&PipelineFault> {
        match &self.outcome {
            UnitOutcome::Faulted(fault) => Some(fault),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, UnitOutcome::Compiled(_) | UnitOutcome::Checked)
    }
}

/// Reports for every unit, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.units.iter().all(UnitReport::is_success)
    }

    /// All diagnostics, unit by unit in input order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.units.iter().flat_map(|u| u.diagnostics.iter())
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics().filter(|d| d.severity.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics().filter(|d| d.severity.is_warning()).count()
    }

    pub fn faults(&self) -> impl Iterator<Item = (&str, &PipelineFault)> {
        self.units
            .iter()
            .filter_map(|u| u.fault().map(|f| (u.unit.as_str(), f)))
    }
}

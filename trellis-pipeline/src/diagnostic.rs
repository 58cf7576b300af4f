//! User-facing diagnostics.
//!
//! Diagnostics are collected per unit into a [`DiagnosticSet`]. Once analysis
//! accepts a unit the set is sealed, and nothing may add to it afterwards.

use std::fmt;

use serde::Serialize;
use trellis_core::Location;

use crate::PipelineFault;

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Prevents the unit from crossing the validity boundary.
    Error,
    /// Should be addressed but doesn't stop compilation.
    Warning,
    Info,
}

impl Severity {
    /// Returns true if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns true if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }

    /// Parse a severity name as written in plugin options.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warning" | "warn" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Who reported a diagnostic.
///
/// `rank` is 0 for the host's own checks and `sequence + 1` for registered
/// extensions, so sorting by it follows registration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reporter {
    pub name: String,
    pub rank: usize,
}

impl Reporter {
    /// The host analysis itself.
    pub fn host() -> Self {
        Self {
            name: "host".to_string(),
            rank: 0,
        }
    }

    pub(crate) fn extension(name: impl Into<String>, sequence: usize) -> Self {
        Self {
            name: name.into(),
            rank: sequence + 1,
        }
    }
}

/// A diagnostic message attached to a location in a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Location,
    pub message: String,
    pub code: String,
    pub reporter: Reporter,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        location: Location,
        reporter: Reporter,
    ) -> Self {
        Self {
            severity,
            location,
            message: message.into(),
            code: code.into(),
            reporter,
        }
    }

    /// Create a host error diagnostic.
    pub fn error(code: &str, message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Error, code, message, location, Reporter::host())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} (at {})",
            self.severity, self.code, self.message, self.location
        )
    }
}

/// Per-unit diagnostic collection.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSet {
    items: Vec<Diagnostic>,
    sealed: bool,
}

impl DiagnosticSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic. Rejected once the set is sealed.
    pub fn push(&mut self, diagnostic: Diagnostic) -> Result<(), PipelineFault> {
        if self.sealed {
            return Err(PipelineFault::LateDiagnostic {
                message: diagnostic.to_string(),
            });
        }
        self.items.push(diagnostic);
        Ok(())
    }

    /// Stop accepting diagnostics.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.severity.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.severity.is_warning()).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics ordered by location, then by reporter registration order.
    ///
    /// The sort is stable, so one reporter's diagnostics at the same location
    /// keep the order they were reported in.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut items = self.items.clone();
        items.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then(a.reporter.rank.cmp(&b.reporter.rank))
        });
        items
    }
}

/// Write-only channel handed to checker extensions.
///
/// Every diagnostic reported through a sink is tagged with the sink's
/// reporter identity.
pub struct DiagnosticSink {
    reporter: Reporter,
    items: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub(crate) fn new(reporter: Reporter) -> Self {
        Self {
            reporter,
            items: Vec::new(),
        }
    }

    /// Identity of the extension this sink belongs to.
    pub fn reporter(&self) -> &str {
        &self.reporter.name
    }

    pub fn report(
        &mut self,
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        location: Location,
    ) {
        self.items.push(Diagnostic::new(
            severity,
            code,
            message,
            location,
            self.reporter.clone(),
        ));
    }

    pub fn error(&mut self, code: &str, message: impl Into<String>, location: Location) {
        self.report(Severity::Error, code, message, location);
    }

    pub fn warning(&mut self, code: &str, message: impl Into<String>, location: Location) {
        self.report(Severity::Warning, code, message, location);
    }

    pub(crate) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.items
    }
}

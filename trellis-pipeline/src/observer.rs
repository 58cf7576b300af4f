//! Host-side stage observers.
//!
//! Observers see each unit's context before and after every stage. They get
//! shared access only, so nothing an observer does can add diagnostics or
//! change the IR.

use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use eyre::Result;
use serde::Serialize;
use trellis_core::FileRules;
use trellis_ir::IrModule;

use crate::{Diagnostic, UnitContext, analysis::BindingSummary};

/// Receives stage lifecycle callbacks for every unit.
///
/// Units run in parallel, so callbacks for different units may interleave.
/// Returning an error faults the unit being processed.
pub trait StageObserver: Send + Sync {
    fn name(&self) -> &'static str;

    #[allow(unused_variables)]
    fn on_before_stage(&self, stage: &str, ctx: &UnitContext<'_>) -> Result<()> {
        Ok(())
    }

    #[allow(unused_variables)]
    fn on_after_stage(&self, stage: &str, ctx: &UnitContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// State of one unit right after a stage completed.
#[derive(Debug, Clone, Serialize)]
pub struct StageSnapshot {
    pub unit: String,
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Vec<BindingSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ir: Option<IrModule>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StageSnapshot {
    fn capture(stage: &str, ctx: &UnitContext<'_>) -> Self {
        Self {
            unit: ctx.unit().to_string(),
            stage: stage.to_string(),
            bindings: ctx
                .analysis
                .as_ref()
                .map(|a| a.bindings.summarize(ctx.tree, &a.descriptors)),
            ir: ctx.ir.clone(),
            diagnostics: ctx.diagnostics.sorted(),
        }
    }

    /// `<unit>/<stage>.json`
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.unit).join(format!("{}.json", self.stage))
    }
}

/// Captures a snapshot after every stage, optionally writing each one to
/// `<dir>/<unit>/<stage>.json` as it is taken.
pub struct SnapshotObserver {
    snapshots: RwLock<Vec<StageSnapshot>>,
    output_dir: Option<PathBuf>,
}

impl SnapshotObserver {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(Vec::new()),
            output_dir: None,
        }
    }

    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshots: RwLock::new(Vec::new()),
            output_dir: Some(output_dir.into()),
        }
    }

    /// Snapshots taken so far, grouped by unit in capture order.
    pub fn snapshots(&self) -> Vec<StageSnapshot> {
        let mut snapshots = self
            .snapshots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        snapshots.sort_by(|a, b| a.unit.cmp(&b.unit));
        snapshots
    }
}

impl Default for SnapshotObserver {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshots describe the latest run, so they are always rewritten.
fn write_snapshot(dir: &Path, snapshot: &StageSnapshot) -> Result<()> {
    let path = dir.join(snapshot.relative_path());
    FileRules::always().write(&path, &serde_json::to_string_pretty(snapshot)?)?;
    Ok(())
}

impl StageObserver for SnapshotObserver {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn on_after_stage(&self, stage: &str, ctx: &UnitContext<'_>) -> Result<()> {
        let snapshot = StageSnapshot::capture(stage, ctx);
        if let Some(dir) = &self.output_dir {
            write_snapshot(dir, &snapshot)?;
        }
        self.snapshots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(snapshot);
        Ok(())
    }
}

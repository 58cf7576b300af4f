//! Build operation - full pipeline and artifact writing.

use std::{path::Path, sync::Arc};

use eyre::{Context, Result};
use tracing::debug;
use trellis_core::{GeneratedFile, WriteResult};
use trellis_pipeline::{Pipeline, SnapshotObserver};
use trellis_syntax::SyntaxTree;

use crate::reports::{BuildReport, UnitStatus};

/// Options for the build operation.
pub struct BuildOptions<'a> {
    /// Directory artifacts are written to.
    pub out_dir: &'a Path,
    /// Where per-stage snapshots go, if requested.
    pub snapshots: Option<&'a Path>,
}

/// Execute the build operation.
///
/// Runs every stage for every unit and writes the artifacts of the units
/// that compiled. Units that failed are reported, not written.
pub fn build(pipeline: Pipeline, units: &[SyntaxTree], opts: BuildOptions) -> Result<BuildReport> {
    let pipeline = match opts.snapshots {
        Some(dir) => pipeline.observer(Arc::new(SnapshotObserver::with_output_dir(dir))),
        None => pipeline,
    };
    let target = pipeline.target();
    let run = pipeline.run(units)?;

    let mut written = Vec::new();
    let mut unchanged = Vec::new();
    for artifact in run.units.iter().filter_map(|u| u.artifact()) {
        let result = artifact
            .write(opts.out_dir)
            .wrap_err_with(|| format!("Failed to write artifact for unit '{}'", artifact.unit()))?;
        debug!(unit = artifact.unit(), ?result, "wrote artifact");
        match result {
            WriteResult::Written => written.push(artifact.file_name()),
            WriteResult::Unchanged => unchanged.push(artifact.file_name()),
        }
    }

    Ok(BuildReport {
        target: target.to_string(),
        out_dir: opts.out_dir.to_path_buf(),
        units: run
            .units
            .iter()
            .map(|unit| UnitStatus {
                name: unit.unit.clone(),
                passed: unit.is_success(),
            })
            .collect(),
        written,
        unchanged,
        diagnostics: run.diagnostics().map(ToString::to_string).collect(),
        faults: run
            .faults()
            .map(|(unit, fault)| format!("{}: {}", unit, fault))
            .collect(),
        snapshots_dir: opts.snapshots.map(Path::to_path_buf),
    })
}

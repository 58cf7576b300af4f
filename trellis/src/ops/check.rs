//! Check operation - analysis without code generation.

use std::path::Path;

use trellis_pipeline::{ConfigError, Pipeline};
use trellis_syntax::SyntaxTree;

use crate::reports::{CheckReport, UnitStatus};

/// Execute the check operation.
///
/// Runs analysis for every unit and collects its diagnostics.
pub fn check(
    pipeline: &Pipeline,
    units: &[SyntaxTree],
    config_path: &Path,
) -> Result<CheckReport, ConfigError> {
    let run = pipeline.check(units)?;

    Ok(CheckReport {
        config_path: config_path.to_path_buf(),
        units: run
            .units
            .iter()
            .map(|unit| UnitStatus {
                name: unit.unit.clone(),
                passed: unit.is_success(),
            })
            .collect(),
        diagnostics: run.diagnostics().map(ToString::to_string).collect(),
        faults: run
            .faults()
            .map(|(unit, fault)| format!("{}: {}", unit, fault))
            .collect(),
        error_count: run.error_count(),
        warning_count: run.warning_count(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use trellis_pipeline::{PluginCatalog, RegistryBuilder};

    use super::*;
    use crate::ops::fixtures::{BROKEN, MAIN, project};

    #[test]
    fn test_check_reports_each_unit() {
        let dir = TempDir::new().unwrap();
        let (config, toml, units) = project(
            dir.path(),
            r#"
                [project]
                name = "demo"
                units = ["main.toml", "broken.toml"]

                [[plugins]]
                id = "accessors"
            "#,
            &[("main", MAIN), ("broken", BROKEN)],
        );
        let registry = RegistryBuilder::discover(toml.manifest(), &PluginCatalog::builtin())
            .unwrap()
            .build();
        let pipeline = Pipeline::new(registry, toml.manifest().project.target).unwrap();

        let report = check(&pipeline, &units, &config).unwrap();

        assert!(!report.is_valid());
        assert_eq!(
            report
                .units
                .iter()
                .map(|u| (u.name.as_str(), u.passed))
                .collect::<Vec<_>>(),
            vec![("main", true), ("broken", false)]
        );
        assert_eq!(report.error_count, 1);
        assert!(report.diagnostics[0].starts_with("error[E0002]"));
    }
}

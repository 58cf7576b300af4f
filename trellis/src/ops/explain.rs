//! Explain operation - pipeline explanation.

use trellis_manifest::TrellisToml;
use trellis_pipeline::{ExtensionPoint, Pipeline, PluginCatalog};

use crate::reports::{
    ExplainReport, ExtensionInfo, PluginInfo, PointInfo, ProjectInfo, StageInfo,
};

/// Execute the explain operation.
///
/// Describes the stages, every registered extension in invocation order,
/// the options each plugin runs with and the final lowering order.
pub fn explain(pipeline: &Pipeline, toml: &TrellisToml, catalog: &PluginCatalog) -> ExplainReport {
    let manifest = toml.manifest();
    let registry = pipeline.registry();

    let stages = pipeline
        .stages()
        .map(|(name, description)| StageInfo {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect();

    let points = ExtensionPoint::ALL
        .iter()
        .map(|point| PointInfo {
            name: point.as_str().to_string(),
            description: point.description().to_string(),
            extensions: registry
                .extensions_for(*point)
                .iter()
                .map(|record| ExtensionInfo {
                    id: record.id.to_string(),
                    order_key: record.order_key,
                    placement: record.placement.as_ref().map(ToString::to_string),
                })
                .collect(),
        })
        .collect();

    let plugins = registry
        .plugins()
        .iter()
        .map(|plugin| {
            let declared = catalog.get(&plugin.id).map(|m| m.options()).unwrap_or(&[]);
            PluginInfo {
                id: plugin.id.clone(),
                description: plugin.description.to_string(),
                options: declared
                    .iter()
                    .map(|spec| {
                        let value = match (plugin.options.get(spec.name), spec.default) {
                            (Some(value), _) => value.to_string(),
                            (None, Some(default)) => format!("{} (default)", default),
                            (None, None) => "(unset)".to_string(),
                        };
                        (spec.name.to_string(), value)
                    })
                    .collect(),
            }
        })
        .collect();

    ExplainReport {
        config_path: toml.path().to_path_buf(),
        project: ProjectInfo {
            name: manifest.project.name.clone(),
            target: pipeline.target().to_string(),
            units: manifest
                .project
                .units
                .iter()
                .map(|u| u.display().to_string())
                .collect(),
        },
        stages,
        points,
        plugins,
        lowering: pipeline.plan().names(),
    }
}

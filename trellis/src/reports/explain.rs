//! Explain command report data structures.

use std::path::PathBuf;

use super::output::{Output, Report};

/// Report data from pipeline explanation.
#[derive(Debug)]
pub struct ExplainReport {
    /// Path to the manifest file.
    pub config_path: PathBuf,
    pub project: ProjectInfo,
    /// Stages in execution order.
    pub stages: Vec<StageInfo>,
    /// Every extension point with its extensions in invocation order.
    pub points: Vec<PointInfo>,
    /// Enabled plugins, in manifest order.
    pub plugins: Vec<PluginInfo>,
    /// Lowering pass identities, in execution order.
    pub lowering: Vec<String>,
}

#[derive(Debug)]
pub struct ProjectInfo {
    pub name: String,
    pub target: String,
    pub units: Vec<String>,
}

#[derive(Debug)]
pub struct StageInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug)]
pub struct PointInfo {
    pub name: String,
    pub description: String,
    pub extensions: Vec<ExtensionInfo>,
}

#[derive(Debug)]
pub struct ExtensionInfo {
    /// `plugin/name`
    pub id: String,
    pub order_key: i64,
    /// Effective placement, lowering passes only.
    pub placement: Option<String>,
}

#[derive(Debug)]
pub struct PluginInfo {
    pub id: String,
    pub description: String,
    /// Declared options with the value the plugin runs with.
    pub options: Vec<(String, String)>,
}

impl Report for ExplainReport {
    fn render(&self, out: &mut dyn Output) {
        out.title("Trellis Pipeline Explanation");
        out.newline();

        out.key_value("Input", &self.config_path.display().to_string());
        out.key_value_indented("Project", &self.project.name);
        out.key_value_indented("Target", &self.project.target);
        out.key_value_indented("Units", &self.project.units.join(", "));
        out.newline();

        out.section("Stages");
        for (i, stage) in self.stages.iter().enumerate() {
            out.numbered_item(i + 1, &format!("{} - {}", stage.name, stage.description));
        }
        out.newline();

        out.section("Extension Points");
        for point in &self.points {
            out.list_item(&format!("{}: {}", point.name, point.description));
            if point.extensions.is_empty() {
                out.preformatted("      (none)");
            }
            for (i, extension) in point.extensions.iter().enumerate() {
                let placement = extension
                    .placement
                    .as_ref()
                    .map(|p| format!(", {}", p))
                    .unwrap_or_default();
                out.preformatted(&format!(
                    "      {}. {} (order {}{})",
                    i + 1,
                    extension.id,
                    extension.order_key,
                    placement
                ));
            }
        }
        out.newline();

        if !self.plugins.is_empty() {
            out.section("Plugins");
            for plugin in &self.plugins {
                out.list_item(&format!("{}: {}", plugin.id, plugin.description));
                for (name, value) in &plugin.options {
                    out.preformatted(&format!("      {}: {}", name, value));
                }
            }
            out.newline();
        }

        out.section("Lowering Order");
        for (i, pass) in self.lowering.iter().enumerate() {
            out.numbered_item(i + 1, pass);
        }
    }
}

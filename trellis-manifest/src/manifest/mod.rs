//! Manifest types and parsing for trellis.toml files.

mod file;
mod parse;
mod placement;
mod plugin;
mod target;

use std::path::PathBuf;

pub use file::TrellisToml;
pub use placement::Placement;
pub use plugin::{PluginConfig, PluginOptions};
use serde::Deserialize;
pub use target::Target;

/// Root manifest for trellis.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Project metadata and inputs
    pub project: ProjectConfig,

    /// Enabled plugins, in discovery order
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

/// The `[project]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,

    #[serde(default)]
    pub target: Target,

    /// Unit files, relative to the manifest. Order is the canonical unit order.
    #[serde(default)]
    pub units: Vec<PathBuf>,

    /// Artifact directory, relative to the manifest.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
}

impl Manifest {
    /// Create a manifest in code, without plugins.
    pub fn new(name: impl Into<String>, target: Target) -> Self {
        Self {
            project: ProjectConfig {
                name: name.into(),
                target,
                units: Vec::new(),
                out_dir: None,
            },
            plugins: Vec::new(),
        }
    }

    pub fn with_plugin(mut self, plugin: PluginConfig) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<PathBuf>) -> Self {
        self.project.units.push(unit.into());
        self
    }

    /// Find an enabled plugin by id.
    pub fn plugin(&self, id: &str) -> Option<&PluginConfig> {
        self.plugins.iter().find(|p| p.id == id)
    }
}
